//! 캡처 프레임 모델.
//!
//! 스케줄러가 생성해 전송 계층에 넘기는 인코딩된 이미지 단위.
//! 전송 후에는 보관하지 않는다.

use base64::{engine::general_purpose::STANDARD as B64, Engine};
use chrono::{DateTime, Utc};

/// JPEG 데이터 URL 접두사
const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// 캡처된 프레임
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    /// 세션 내 단조 증가 시퀀스 (재시작 시 0부터)
    pub seq: u64,
    /// 캡처 시각
    pub captured_at: DateTime<Utc>,
    /// JPEG 인코딩된 이미지 바이트
    pub jpeg: Vec<u8>,
}

impl CaptureFrame {
    pub fn new(seq: u64, jpeg: Vec<u8>) -> Self {
        Self {
            seq,
            captured_at: Utc::now(),
            jpeg,
        }
    }

    /// `data:image/jpeg;base64,...` 형식 데이터 URL
    pub fn to_data_url(&self) -> String {
        let mut out = String::with_capacity(JPEG_DATA_URL_PREFIX.len() + self.jpeg.len() * 4 / 3 + 4);
        out.push_str(JPEG_DATA_URL_PREFIX);
        B64.encode_string(&self.jpeg, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_has_jpeg_prefix() {
        let frame = CaptureFrame::new(3, vec![0xFF, 0xD8, 0xFF]);
        assert_eq!(frame.to_data_url(), "data:image/jpeg;base64,/9j/");
        assert_eq!(frame.seq, 3);
    }
}
