//! 도메인 모델.

pub mod frame;
pub mod gesture;
pub mod profile;
pub mod session;
