//! 카메라 소스 어댑터.
//!
//! [`ImageSequenceSource`]: 디렉토리의 이미지를 순환 재생 (녹화본 재생, 오프라인 시연)

use gestlink_core::error::CoreError;
use gestlink_core::ports::camera::CameraSource;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::encoder::{encode_frame, FrameEncoding};

/// 지원 이미지 확장자
const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// 이미지 시퀀스 소스
///
/// 로드 시점에 모든 프레임을 전송 규격으로 미리 인코딩해 두므로
/// `current_frame`은 메모리 복사만 수행한다.
pub struct ImageSequenceSource {
    frames: Vec<Vec<u8>>,
    cursor: usize,
    label: String,
}

impl ImageSequenceSource {
    /// 디렉토리의 이미지 파일을 이름순으로 로드
    pub fn from_dir(dir: &Path, encoding: FrameEncoding) -> Result<Self, CoreError> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| CoreError::Config(format!("소스 디렉토리 읽기 실패: {}: {e}", dir.display())))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image_file(path))
            .collect();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            match image::open(path) {
                Ok(img) => frames.push(encode_frame(&img, encoding)?),
                Err(e) => warn!("이미지 로드 실패, 건너뜀: {}: {e}", path.display()),
            }
        }

        if frames.is_empty() {
            return Err(CoreError::Config(format!(
                "소스 디렉토리에 사용 가능한 이미지 없음: {}",
                dir.display()
            )));
        }

        info!("이미지 시퀀스 로드: {}개 ({})", frames.len(), dir.display());
        Ok(Self {
            frames,
            cursor: 0,
            label: format!("이미지 시퀀스 {}", dir.display()),
        })
    }

    /// 메모리 이미지로부터 생성
    pub fn from_images(images: &[DynamicImage], encoding: FrameEncoding) -> Result<Self, CoreError> {
        let frames = images
            .iter()
            .map(|img| encode_frame(img, encoding))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            label: format!("메모리 이미지 {}개", frames.len()),
            frames,
            cursor: 0,
        })
    }

    /// 프레임 개수
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl CameraSource for ImageSequenceSource {
    fn current_frame(&mut self) -> Option<Vec<u8>> {
        if self.frames.is_empty() {
            return None;
        }
        let frame = self.frames[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.frames.len();
        Some(frame)
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}
