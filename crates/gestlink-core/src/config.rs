//! 애플리케이션 설정 구조체.
//!
//! 백엔드 URL, 캡처/메트릭/통계/데모 주기, 디코더 정책 등 런타임 설정을 정의한다.
//! 설정값은 세션 생성 시 한 번 주입되며 이후 변경되지 않는다.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 백엔드 서버 연결 설정
    pub server: ServerConfig,
    /// 프레임 캡처 설정
    #[serde(default)]
    pub capture: CaptureConfig,
    /// 세션 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// 통계 폴링 설정
    #[serde(default)]
    pub stats: StatsConfig,
    /// 데모 시뮬레이터 설정
    #[serde(default)]
    pub demo: DemoConfig,
    /// 결과 디코더 설정
    #[serde(default)]
    pub decoder: DecoderConfig,
}

impl AppConfig {
    /// 기본 설정 생성
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig::default(),
            capture: CaptureConfig::default(),
            metrics: MetricsConfig::default(),
            stats: StatsConfig::default(),
            demo: DemoConfig::default(),
            decoder: DecoderConfig::default(),
        }
    }

    /// 설정값 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        let base = url::Url::parse(&self.server.base_url).map_err(|e| CoreError::Validation {
            field: "server.base_url".to_string(),
            message: format!("URL 파싱 실패: {e}"),
        })?;
        if !matches!(base.scheme(), "http" | "https" | "ws" | "wss") {
            return Err(CoreError::Validation {
                field: "server.base_url".to_string(),
                message: format!("지원하지 않는 스킴: {}", base.scheme()),
            });
        }

        let intervals = [
            ("capture.interval_ms", self.capture.interval_ms),
            ("metrics.report_interval_ms", self.metrics.report_interval_ms),
            ("stats.poll_interval_ms", self.stats.poll_interval_ms),
            ("demo.interval_ms", self.demo.interval_ms),
        ];
        for (field, value) in intervals {
            if value == 0 {
                return Err(CoreError::Validation {
                    field: field.to_string(),
                    message: "간격은 0보다 커야 함".to_string(),
                });
            }
        }

        if !(1..=100).contains(&self.capture.jpeg_quality) {
            return Err(CoreError::Validation {
                field: "capture.jpeg_quality".to_string(),
                message: format!("1~100 범위 밖: {}", self.capture.jpeg_quality),
            });
        }

        if self.capture.frame_width == 0 || self.capture.frame_height == 0 {
            return Err(CoreError::Validation {
                field: "capture.frame_width/frame_height".to_string(),
                message: "프레임 크기는 0보다 커야 함".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

// ============================================================
// 서버 설정
// ============================================================

/// 서버 연결 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 백엔드 기본 URL (REST + WebSocket 공용)
    pub base_url: String,
    /// REST 요청 타임아웃 (초)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// REST 요청 타임아웃
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    10
}

// ============================================================
// 캡처 설정
// ============================================================

/// 프레임 캡처 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// 캡처/전송 주기 (밀리초). 카메라·디스플레이 주사율과 무관하게 고정.
    #[serde(default = "default_capture_interval_ms")]
    pub interval_ms: u64,
    /// 전송 프레임 너비 (픽셀)
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,
    /// 전송 프레임 높이 (픽셀)
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,
    /// JPEG 품질 (1~100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// 이미지 시퀀스 소스 디렉토리 (없으면 카메라 미연결 상태)
    #[serde(default)]
    pub source_dir: Option<PathBuf>,
}

impl CaptureConfig {
    /// 캡처 주기
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_capture_interval_ms(),
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
            jpeg_quality: default_jpeg_quality(),
            source_dir: None,
        }
    }
}

fn default_capture_interval_ms() -> u64 {
    100
}

fn default_frame_width() -> u32 {
    640
}

fn default_frame_height() -> u32 {
    480
}

fn default_jpeg_quality() -> u8 {
    80
}

// ============================================================
// 메트릭 / 통계 / 데모 설정
// ============================================================

/// 세션 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// fps 보고 주기 (밀리초)
    #[serde(default = "default_report_interval_ms")]
    pub report_interval_ms: u64,
}

impl MetricsConfig {
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_ms: default_report_interval_ms(),
        }
    }
}

fn default_report_interval_ms() -> u64 {
    1_000
}

/// 통계 폴링 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// 통계 폴링 활성화
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 폴링 주기 (밀리초)
    #[serde(default = "default_stats_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl StatsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: default_stats_poll_interval_ms(),
        }
    }
}

fn default_stats_poll_interval_ms() -> u64 {
    10_000
}

/// 데모 시뮬레이터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// 이벤트 재생 주기 (밀리초)
    #[serde(default = "default_demo_interval_ms")]
    pub interval_ms: u64,
}

impl DemoConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_demo_interval_ms(),
        }
    }
}

fn default_demo_interval_ms() -> u64 {
    3_000
}

// ============================================================
// 디코더 설정
// ============================================================

/// 신뢰도 범위([0,1]) 밖 값 처리 정책
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidencePolicy {
    /// 디코딩 에러로 처리하고 메시지 폐기
    #[default]
    Reject,
    /// [0,1]로 잘라서 전달 (경고 로그)
    Clamp,
}

impl std::str::FromStr for ConfidencePolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reject" => Ok(Self::Reject),
            "clamp" => Ok(Self::Clamp),
            other => Err(CoreError::Config(format!(
                "알 수 없는 신뢰도 정책: {other} (reject|clamp)"
            ))),
        }
    }
}

/// 결과 디코더 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// 신뢰도 범위 정책
    #[serde(default)]
    pub confidence_policy: ConfidencePolicy,
}

fn default_true() -> bool {
    true
}
