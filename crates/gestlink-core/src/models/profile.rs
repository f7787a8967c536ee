//! 프로필 및 제스처 통계 모델.
//!
//! 영속 계층(외부 백엔드)이 소유하는 엔티티. 클라이언트는 id로만 참조하며
//! REST 응답을 그대로 역직렬화한다.

use crate::error::CoreError;
use crate::models::gesture::{ActionKind, GestureKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 프로필별 인식 임계값과 감도. 서버가 인식 시 적용한다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureSettings {
    pub index_point_threshold: f64,
    pub fist_threshold: f64,
    pub thumbs_up_threshold: f64,
    pub open_hand_threshold: f64,
    pub pinch_threshold: f64,
    pub cursor_sensitivity: f64,
    pub scroll_sensitivity: f64,
    pub smoothing_factor: f64,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            index_point_threshold: 0.85,
            fist_threshold: 0.80,
            thumbs_up_threshold: 0.75,
            open_hand_threshold: 0.70,
            pinch_threshold: 0.65,
            cursor_sensitivity: 1.0,
            scroll_sensitivity: 1.0,
            smoothing_factor: 0.5,
        }
    }
}

impl GestureSettings {
    /// 제스처별 임계값. 액션이 없는 라벨은 `None`.
    pub fn threshold(&self, gesture: GestureKind) -> Option<f64> {
        match gesture {
            GestureKind::IndexPoint => Some(self.index_point_threshold),
            GestureKind::Fist => Some(self.fist_threshold),
            GestureKind::ThumbsUp => Some(self.thumbs_up_threshold),
            GestureKind::OpenHand => Some(self.open_hand_threshold),
            GestureKind::Pinch => Some(self.pinch_threshold),
            GestureKind::None | GestureKind::Unknown => None,
        }
    }

    /// 임계값 변경. 범위 검사는 `validate`에서 한다.
    pub fn set_threshold(&mut self, gesture: GestureKind, value: f64) -> Result<(), CoreError> {
        let slot = match gesture {
            GestureKind::IndexPoint => &mut self.index_point_threshold,
            GestureKind::Fist => &mut self.fist_threshold,
            GestureKind::ThumbsUp => &mut self.thumbs_up_threshold,
            GestureKind::OpenHand => &mut self.open_hand_threshold,
            GestureKind::Pinch => &mut self.pinch_threshold,
            GestureKind::None | GestureKind::Unknown => {
                return Err(CoreError::Validation {
                    field: "gesture_settings".to_string(),
                    message: format!("임계값 없는 제스처: {gesture}"),
                })
            }
        };
        *slot = value;
        Ok(())
    }

    /// 서버 검증 범위와 동일: 임계값·스무딩 [0,1], 감도 [0.1,3]
    pub fn validate(&self) -> Result<(), CoreError> {
        let ranged = [
            ("index_point_threshold", self.index_point_threshold, 0.0, 1.0),
            ("fist_threshold", self.fist_threshold, 0.0, 1.0),
            ("thumbs_up_threshold", self.thumbs_up_threshold, 0.0, 1.0),
            ("open_hand_threshold", self.open_hand_threshold, 0.0, 1.0),
            ("pinch_threshold", self.pinch_threshold, 0.0, 1.0),
            ("cursor_sensitivity", self.cursor_sensitivity, 0.1, 3.0),
            ("scroll_sensitivity", self.scroll_sensitivity, 0.1, 3.0),
            ("smoothing_factor", self.smoothing_factor, 0.0, 1.0),
        ];
        for (field, value, min, max) in ranged {
            if !(min..=max).contains(&value) {
                return Err(CoreError::Validation {
                    field: field.to_string(),
                    message: format!("{value}: 허용 범위 [{min}, {max}] 밖"),
                });
            }
        }
        Ok(())
    }
}

/// 프로필별 제스처 → 액션 재매핑
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionMapping {
    pub index_point: ActionKind,
    pub fist: ActionKind,
    pub thumbs_up: ActionKind,
    pub open_hand: ActionKind,
    pub pinch: ActionKind,
}

impl Default for ActionMapping {
    fn default() -> Self {
        Self {
            index_point: GestureKind::IndexPoint.default_action(),
            fist: GestureKind::Fist.default_action(),
            thumbs_up: GestureKind::ThumbsUp.default_action(),
            open_hand: GestureKind::OpenHand.default_action(),
            pinch: GestureKind::Pinch.default_action(),
        }
    }
}

impl ActionMapping {
    pub fn action_for(&self, gesture: GestureKind) -> ActionKind {
        match gesture {
            GestureKind::IndexPoint => self.index_point,
            GestureKind::Fist => self.fist,
            GestureKind::ThumbsUp => self.thumbs_up,
            GestureKind::OpenHand => self.open_hand,
            GestureKind::Pinch => self.pinch,
            GestureKind::None | GestureKind::Unknown => ActionKind::None,
        }
    }

    /// 매핑 변경. none/unknown은 재매핑 불가.
    pub fn remap(&mut self, gesture: GestureKind, action: ActionKind) -> Result<(), CoreError> {
        let slot = match gesture {
            GestureKind::IndexPoint => &mut self.index_point,
            GestureKind::Fist => &mut self.fist,
            GestureKind::ThumbsUp => &mut self.thumbs_up,
            GestureKind::OpenHand => &mut self.open_hand,
            GestureKind::Pinch => &mut self.pinch,
            GestureKind::None | GestureKind::Unknown => {
                return Err(CoreError::Validation {
                    field: "action_mapping".to_string(),
                    message: format!("재매핑할 수 없는 제스처: {gesture}"),
                })
            }
        };
        *slot = action;
        Ok(())
    }
}

/// 서버 측 제스처 설정 범위 (임계값, 액션 매핑)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub gesture_settings: GestureSettings,
    #[serde(default)]
    pub action_mapping: ActionMapping,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// 프로필 생성 요청
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileCreate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gesture_settings: Option<GestureSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_mapping: Option<ActionMapping>,
}

impl ProfileCreate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// 프로필 부분 수정 요청
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gesture_settings: Option<GestureSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_mapping: Option<ActionMapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.gesture_settings.is_none()
            && self.action_mapping.is_none()
            && self.is_active.is_none()
    }
}

/// 서버에 기록된 제스처 로그 한 건
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureLog {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub profile_id: Option<String>,
    pub gesture: String,
    pub confidence: f64,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

/// 제스처 통계 (`GET /api/gestures/stats`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GestureStats {
    pub total_gestures: u64,
    #[serde(default)]
    pub gesture_counts: BTreeMap<String, u64>,
    #[serde(default)]
    pub recent_logs: Vec<GestureLog>,
}

impl GestureStats {
    /// "데이터 없음" 상태
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.total_gestures == 0 && self.gesture_counts.is_empty()
    }

    /// 횟수 내림차순 (동률이면 라벨 오름차순)
    pub fn sorted_counts(&self) -> Vec<(&str, u64)> {
        let mut counts: Vec<(&str, u64)> = self
            .gesture_counts
            .iter()
            .map(|(label, count)| (label.as_str(), *count))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        counts
    }
}

/// API 상태 확인 응답 (`GET /api/`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiHealth {
    pub message: String,
    pub version: String,
    pub status: String,
}

fn default_true() -> bool {
    true
}
