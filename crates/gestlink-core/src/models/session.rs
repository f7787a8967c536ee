//! 세션 상태, 전송 상태, 메트릭 관측값.

use serde::{Deserialize, Serialize};

/// 캡처 세션 상태 (Idle → Active → Idle)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    Active,
}

/// 데모 시뮬레이터 상태 (세션 상태와 독립)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DemoState {
    #[default]
    Idle,
    Running,
}

/// 전송 세션 상태
///
/// Disconnected → Connecting → Open → Closing → Closed,
/// 에러 시 어느 상태에서든 Disconnected로 복귀.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    Closing,
    Closed,
}

impl TransportState {
    /// 허용된 전이인지 확인
    pub fn can_transition_to(self, next: TransportState) -> bool {
        use TransportState::*;
        match (self, next) {
            (_, Disconnected) => true,
            (Disconnected | Closed, Connecting) => true,
            (Connecting, Open) => true,
            (Connecting | Open, Closing) => true,
            (Closing, Closed) => true,
            _ => false,
        }
    }

    /// 다시 열 수 있는 상태인지
    pub fn is_reopenable(self) -> bool {
        matches!(self, TransportState::Disconnected | TransportState::Closed)
    }
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportState::Disconnected => write!(f, "Disconnected"),
            TransportState::Connecting => write!(f, "Connecting"),
            TransportState::Open => write!(f, "Open"),
            TransportState::Closing => write!(f, "Closing"),
            TransportState::Closed => write!(f, "Closed"),
        }
    }
}

/// 표시 전용 세션 메트릭. 제어 흐름에 관여하지 않는다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetrics {
    /// 직전 1초 동안 실제 전송된 프레임 수
    pub fps: u32,
    /// 최근 전송 → 다음 결과 수신까지의 근사 왕복 지연 (밀리초)
    pub latency_ms: Option<u64>,
}

/// 소비자에게 전달하는 비차단 알림 수준
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// 비차단 알림 (전송 끊김, 통계 조회 실패, 캡처 저하 등)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}
