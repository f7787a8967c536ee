//! 카메라 소스 포트.
//!
//! 구현: `gestlink-vision` crate (이미지 시퀀스 소스 등)

/// 현재 프레임을 즉시 반환하는 카메라 소스
///
/// 호출은 제어 타임라인 위에서 이루어지므로 블로킹 I/O를 수행해서는 안 된다.
pub trait CameraSource: Send {
    /// 현재 프레임의 JPEG 바이트.
    ///
    /// 장치가 준비되지 않았으면 `None` (에러가 아닌 저하 상태 신호).
    fn current_frame(&mut self) -> Option<Vec<u8>>;

    /// 로그용 소스 설명
    fn describe(&self) -> String {
        "camera".to_string()
    }
}

/// 연결된 카메라가 없는 소스. 모든 틱이 건너뛰어진다.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCamera;

impl CameraSource for NoCamera {
    fn current_frame(&mut self) -> Option<Vec<u8>> {
        None
    }

    fn describe(&self) -> String {
        "카메라 없음".to_string()
    }
}
