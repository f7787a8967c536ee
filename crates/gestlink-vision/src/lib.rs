//! # gestlink-vision
//!
//! 프레임 전처리 크레이트.
//! 카메라 소스 어댑터와 전송용 리사이즈/JPEG 인코딩을 담당한다.

pub mod encoder;
pub mod source;
