//! 인식 결과 디코더.
//!
//! 수신 텍스트 메시지를 검증된 [`GestureReading`]으로 변환한다.
//! 잘못된 메시지는 [`DecodeError`]로 거부되며 세션은 계속 진행된다.
//!
//! 와이어 필드: `gesture`, `confidence` (필수), `action`, `stable`,
//! `gesture_changed`, `duration`, `details`, `hands_detected`, `handedness` (선택).
//! `{"error": "..."}` 형태는 서버 측 처리 실패 보고로 취급한다.

use gestlink_core::config::ConfidencePolicy;
use gestlink_core::error::CoreError;
use gestlink_core::models::gesture::{ActionKind, GestureKind, GestureReading, Handedness};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

/// 디코딩 에러
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// JSON 파싱 실패
    #[error("JSON 파싱 실패: {0}")]
    Malformed(String),

    /// 바이너리 메시지가 UTF-8이 아님
    #[error("UTF-8 아닌 메시지: {0}")]
    InvalidUtf8(String),

    /// 최상위가 객체가 아님
    #[error("메시지가 JSON 객체가 아님")]
    NotAnObject,

    /// 필수 필드 누락
    #[error("필수 필드 누락: {0}")]
    MissingField(&'static str),

    /// 필드 타입 불일치
    #[error("필드 타입 오류: {0}")]
    InvalidType(&'static str),

    /// 신뢰도가 [0,1] 밖
    #[error("신뢰도 범위 밖: {0}")]
    ConfidenceOutOfRange(f64),

    /// 수치 필드가 유한하지 않거나 음수
    #[error("수치 필드 값 오류 — {field}: {value}")]
    InvalidNumber {
        field: &'static str,
        value: f64,
    },

    /// 어휘 밖 액션
    #[error("알 수 없는 액션: {0}")]
    UnknownAction(String),
}

impl From<DecodeError> for CoreError {
    fn from(err: DecodeError) -> Self {
        CoreError::Decode(err.to_string())
    }
}

/// 디코딩 결과
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// 정상 판독값
    Reading(GestureReading),
    /// 서버가 보고한 처리 실패 (`{"error": ...}`)
    ServerError(String),
}

/// 인식 결과 디코더
///
/// 마지막 안정 제스처를 진단용으로만 추적한다. 변경 판정은 서버 플래그를 그대로 따른다.
#[derive(Debug, Default)]
pub struct GestureResultDecoder {
    policy: ConfidencePolicy,
    last_stable: Option<GestureKind>,
    decoded: u64,
    rejected: u64,
}

impl GestureResultDecoder {
    pub fn new(policy: ConfidencePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// 메시지 하나를 디코딩
    pub fn decode(&mut self, raw: &str) -> Result<Decoded, DecodeError> {
        match self.decode_message(raw) {
            Ok(decoded) => {
                if let Decoded::Reading(reading) = &decoded {
                    self.decoded += 1;
                    self.track_stable(reading);
                }
                Ok(decoded)
            }
            Err(e) => {
                self.rejected += 1;
                Err(e)
            }
        }
    }

    /// 바이너리 메시지 디코딩. UTF-8이 아니면 거부로 집계한다.
    pub fn decode_bytes(&mut self, raw: &[u8]) -> Result<Decoded, DecodeError> {
        match std::str::from_utf8(raw) {
            Ok(text) => self.decode(text),
            Err(e) => {
                self.rejected += 1;
                Err(DecodeError::InvalidUtf8(e.to_string()))
            }
        }
    }

    /// 마지막으로 관측한 안정 제스처
    pub fn last_stable(&self) -> Option<GestureKind> {
        self.last_stable
    }

    /// 정상 디코딩 건수
    pub fn decoded_count(&self) -> u64 {
        self.decoded
    }

    /// 거부 건수
    pub fn rejected_count(&self) -> u64 {
        self.rejected
    }

    /// 세션 재시작 시 진단 상태 초기화
    pub fn reset(&mut self) {
        self.last_stable = None;
        self.decoded = 0;
        self.rejected = 0;
    }

    fn track_stable(&mut self, reading: &GestureReading) {
        if !reading.stable {
            return;
        }
        if self.last_stable != Some(reading.gesture) {
            debug!(
                "안정 제스처: {:?} → {} (변경 플래그 {})",
                self.last_stable.map(|g| g.as_str()),
                reading.gesture,
                reading.changed
            );
            self.last_stable = Some(reading.gesture);
        }
    }

    fn decode_message(&self, raw: &str) -> Result<Decoded, DecodeError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| DecodeError::Malformed(e.to_string()))?;
        let obj = value.as_object().ok_or(DecodeError::NotAnObject)?;

        if let Some(error) = obj.get("error") {
            let message = match error {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Ok(Decoded::ServerError(message));
        }

        let gesture = parse_gesture(obj)?;
        let confidence = self.parse_confidence(obj)?;
        let action = parse_action(obj, gesture)?;

        let reading = GestureReading {
            gesture,
            action,
            confidence,
            stable: opt_bool(obj, "stable")?.unwrap_or(false),
            changed: opt_bool(obj, "gesture_changed")?.unwrap_or(false),
            duration_secs: parse_duration(obj)?,
            details: parse_details(obj)?,
            hand_count: parse_hand_count(obj)?,
            handedness: opt_str(obj, "handedness")?
                .map(Handedness::from_label)
                .unwrap_or_default(),
        };
        Ok(Decoded::Reading(reading))
    }

    fn parse_confidence(&self, obj: &Map<String, Value>) -> Result<f64, DecodeError> {
        let value = obj
            .get("confidence")
            .filter(|v| !v.is_null())
            .ok_or(DecodeError::MissingField("confidence"))?
            .as_f64()
            .ok_or(DecodeError::InvalidType("confidence"))?;

        if !value.is_finite() {
            return Err(DecodeError::InvalidNumber {
                field: "confidence",
                value,
            });
        }
        if (0.0..=1.0).contains(&value) {
            return Ok(value);
        }
        match self.policy {
            ConfidencePolicy::Reject => Err(DecodeError::ConfidenceOutOfRange(value)),
            ConfidencePolicy::Clamp => {
                warn!("신뢰도 범위 밖 값 보정: {value}");
                Ok(value.clamp(0.0, 1.0))
            }
        }
    }
}

fn parse_gesture(obj: &Map<String, Value>) -> Result<GestureKind, DecodeError> {
    let label = opt_str(obj, "gesture")?.ok_or(DecodeError::MissingField("gesture"))?;
    Ok(GestureKind::from_label(label).unwrap_or_else(|| {
        warn!("어휘 밖 제스처 라벨: {label} → unknown");
        GestureKind::Unknown
    }))
}

/// 액션 누락 시 제스처의 기본 매핑을 사용. 서버가 보낸 값은 매핑과 달라도 그대로 따른다.
fn parse_action(obj: &Map<String, Value>, gesture: GestureKind) -> Result<ActionKind, DecodeError> {
    match opt_str(obj, "action")? {
        Some(label) => {
            ActionKind::from_label(label).ok_or_else(|| DecodeError::UnknownAction(label.to_string()))
        }
        None => Ok(gesture.default_action()),
    }
}

fn parse_duration(obj: &Map<String, Value>) -> Result<f64, DecodeError> {
    let Some(value) = obj.get("duration").filter(|v| !v.is_null()) else {
        return Ok(0.0);
    };
    let secs = value.as_f64().ok_or(DecodeError::InvalidType("duration"))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(DecodeError::InvalidNumber {
            field: "duration",
            value: secs,
        });
    }
    Ok(secs)
}

/// 수치 멤버만 유지하고 나머지는 무시
fn parse_details(obj: &Map<String, Value>) -> Result<BTreeMap<String, f64>, DecodeError> {
    match obj.get("details") {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(members)) => Ok(members
            .iter()
            .filter_map(|(key, value)| {
                value
                    .as_f64()
                    .filter(|v| v.is_finite())
                    .map(|v| (key.clone(), v))
            })
            .collect()),
        Some(_) => Err(DecodeError::InvalidType("details")),
    }
}

fn parse_hand_count(obj: &Map<String, Value>) -> Result<u32, DecodeError> {
    match obj.get("hands_detected") {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or(DecodeError::InvalidType("hands_detected")),
    }
}

fn opt_bool(obj: &Map<String, Value>, key: &'static str) -> Result<Option<bool>, DecodeError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(DecodeError::InvalidType(key)),
    }
}

fn opt_str<'a>(obj: &'a Map<String, Value>, key: &'static str) -> Result<Option<&'a str>, DecodeError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(DecodeError::InvalidType(key)),
    }
}
