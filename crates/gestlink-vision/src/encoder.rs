//! 프레임 인코더.
//!
//! fast_image_resize 기반 리사이즈 + JPEG 인코딩.

use fast_image_resize::{images::Image as FirImage, ResizeAlg, ResizeOptions, Resizer};
use gestlink_core::error::CoreError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};
use tracing::debug;

/// 전송 프레임 인코딩 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameEncoding {
    pub width: u32,
    pub height: u32,
    /// JPEG 품질 (1~100)
    pub quality: u8,
}

impl Default for FrameEncoding {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            quality: 80,
        }
    }
}

/// RGB 리사이즈
pub fn resize_rgb(image: &DynamicImage, width: u32, height: u32) -> Result<RgbImage, CoreError> {
    let (src_w, src_h) = (image.width(), image.height());
    let src_rgb = image.to_rgb8();

    if src_w == width && src_h == height {
        return Ok(src_rgb);
    }
    if src_w == 0 || src_h == 0 {
        return Err(CoreError::Internal("소스 이미지 크기 0".to_string()));
    }
    if width == 0 || height == 0 {
        return Err(CoreError::Internal("목표 이미지 크기 0".to_string()));
    }

    let src_image = FirImage::from_vec_u8(
        src_w,
        src_h,
        src_rgb.into_raw(),
        fast_image_resize::PixelType::U8x3,
    )
    .map_err(|e| CoreError::Internal(format!("소스 이미지 생성 실패: {e}")))?;

    let mut dst_image = FirImage::new(width, height, fast_image_resize::PixelType::U8x3);

    let mut resizer = Resizer::new();
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(
        fast_image_resize::FilterType::Bilinear,
    ));

    resizer
        .resize(&src_image, &mut dst_image, &options)
        .map_err(|e| CoreError::Internal(format!("리사이즈 실패: {e}")))?;

    RgbImage::from_raw(width, height, dst_image.into_vec())
        .ok_or_else(|| CoreError::Internal("결과 이미지 생성 실패".to_string()))
}

/// JPEG 인코딩
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, CoreError> {
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    encoder
        .encode_image(image)
        .map_err(|e| CoreError::Internal(format!("JPEG 인코딩 실패: {e}")))?;

    debug!(
        "JPEG 인코딩: {}x{} → {} bytes (품질 {})",
        image.width(),
        image.height(),
        out.len(),
        quality
    );
    Ok(out)
}

/// 전송 규격으로 리사이즈 후 JPEG 인코딩
pub fn encode_frame(image: &DynamicImage, encoding: FrameEncoding) -> Result<Vec<u8>, CoreError> {
    let resized = resize_rgb(image, encoding.width, encoding.height)?;
    encode_jpeg(&resized, encoding.quality)
}
