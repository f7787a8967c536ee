//! 제스처 어휘와 인식 결과 모델.
//!
//! 인식 엔진과 공유하는 제스처/액션 어휘, 디코딩된 판독값(`GestureReading`),
//! 소비자에게 전달되는 이벤트(`GestureEvent`)를 정의.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 제스처 라벨 (고정 어휘 + none/unknown)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    /// 검지만 편 상태
    IndexPoint,
    /// 주먹
    Fist,
    /// 엄지 올림
    ThumbsUp,
    /// 손바닥 펼침
    OpenHand,
    /// 엄지·검지 집기
    Pinch,
    /// 손 미검출
    None,
    /// 어휘 밖 또는 미확정
    Unknown,
}

impl GestureKind {
    /// 액션이 매핑된 인식 제스처 목록 (표시 순서)
    pub const RECOGNIZED: [GestureKind; 5] = [
        GestureKind::IndexPoint,
        GestureKind::Fist,
        GestureKind::ThumbsUp,
        GestureKind::OpenHand,
        GestureKind::Pinch,
    ];

    /// 와이어 라벨로부터 변환. 어휘 밖이면 `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "index_point" => Some(Self::IndexPoint),
            "fist" => Some(Self::Fist),
            "thumbs_up" => Some(Self::ThumbsUp),
            "open_hand" => Some(Self::OpenHand),
            "pinch" => Some(Self::Pinch),
            "none" => Some(Self::None),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// 와이어 라벨
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IndexPoint => "index_point",
            Self::Fist => "fist",
            Self::ThumbsUp => "thumbs_up",
            Self::OpenHand => "open_hand",
            Self::Pinch => "pinch",
            Self::None => "none",
            Self::Unknown => "unknown",
        }
    }

    /// 기본 액션 매핑
    pub fn default_action(&self) -> ActionKind {
        match self {
            Self::IndexPoint => ActionKind::MoveCursor,
            Self::Fist => ActionKind::LeftClick,
            Self::ThumbsUp => ActionKind::RightClick,
            Self::OpenHand => ActionKind::Scroll,
            Self::Pinch => ActionKind::DragDrop,
            Self::None | Self::Unknown => ActionKind::None,
        }
    }

    /// 기본 인식 임계값 (프로필이 덮어쓸 수 있음)
    pub fn default_threshold(&self) -> Option<f64> {
        match self {
            Self::IndexPoint => Some(0.85),
            Self::Fist => Some(0.80),
            Self::ThumbsUp => Some(0.75),
            Self::OpenHand => Some(0.70),
            Self::Pinch => Some(0.65),
            Self::None | Self::Unknown => None,
        }
    }

    /// 표시용 이모지
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::IndexPoint => "☝️",
            Self::Fist => "✊",
            Self::ThumbsUp => "👍",
            Self::OpenHand => "✋",
            Self::Pinch => "👌",
            Self::None => "❌",
            Self::Unknown => "❓",
        }
    }
}

impl std::fmt::Display for GestureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 제스처에 매핑되는 액션
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    MoveCursor,
    LeftClick,
    RightClick,
    Scroll,
    DragDrop,
    None,
}

impl ActionKind {
    /// 와이어 라벨로부터 변환. 어휘 밖이면 `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "move_cursor" => Some(Self::MoveCursor),
            "left_click" => Some(Self::LeftClick),
            "right_click" => Some(Self::RightClick),
            "scroll" => Some(Self::Scroll),
            "drag_drop" => Some(Self::DragDrop),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MoveCursor => "move_cursor",
            Self::LeftClick => "left_click",
            Self::RightClick => "right_click",
            Self::Scroll => "scroll",
            Self::DragDrop => "drag_drop",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 손 방향 (엔진 보고값)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
    #[default]
    Unknown,
}

impl Handedness {
    /// 엔진 라벨("Left"/"Right", 대소문자 무시)로부터 변환
    pub fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("left") {
            Self::Left
        } else if label.eq_ignore_ascii_case("right") {
            Self::Right
        } else {
            Self::Unknown
        }
    }
}

/// 검증·정규화된 인식 결과
///
/// `stable`/`changed` 플래그는 인식 엔진이 판정한 값이며 클라이언트에서 재계산하지 않는다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GestureReading {
    /// 제스처 라벨
    pub gesture: GestureKind,
    /// 매핑된 액션
    pub action: ActionKind,
    /// 신뢰도 (항상 0.0 ~ 1.0)
    pub confidence: f64,
    /// 디바운스 구간 동안 유지된 제스처 여부
    pub stable: bool,
    /// 직전 안정 제스처와 달라졌는지 여부
    pub changed: bool,
    /// 현재 제스처 유지 시간 (초)
    #[serde(rename = "duration")]
    pub duration_secs: f64,
    /// 수치 부가 정보 (예: 정규화 커서 좌표 `cursor_x`, `cursor_y`)
    #[serde(default)]
    pub details: BTreeMap<String, f64>,
    /// 검출된 손 개수
    pub hand_count: u32,
    /// 손 방향
    pub handedness: Handedness,
}

impl GestureReading {
    /// 손 미검출 판독값
    pub fn no_hand() -> Self {
        Self {
            gesture: GestureKind::None,
            action: ActionKind::None,
            confidence: 0.0,
            stable: false,
            changed: false,
            duration_secs: 0.0,
            details: BTreeMap::new(),
            hand_count: 0,
            handedness: Handedness::Unknown,
        }
    }
}

/// 소비자(통계, UI)에게 전달되는 제스처 이벤트
///
/// 변경 플래그가 true인 판독값에 대해서만 생성된다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GestureEvent {
    #[serde(flatten)]
    pub reading: GestureReading,
    /// 클라이언트 수신 시각
    pub received_at: DateTime<Utc>,
}

impl GestureEvent {
    /// 판독값에 수신 시각을 찍어 이벤트 생성
    pub fn stamp(reading: GestureReading, received_at: DateTime<Utc>) -> Self {
        Self {
            reading,
            received_at,
        }
    }

    pub fn gesture(&self) -> GestureKind {
        self.reading.gesture
    }

    pub fn action(&self) -> ActionKind {
        self.reading.action
    }

    pub fn confidence(&self) -> f64 {
        self.reading.confidence
    }
}
