//! 데모 시뮬레이터.
//!
//! 백엔드 없이 고정된 다섯 개 제스처를 일정 주기(기본 3초)로 순환 재생한다.
//! 모든 판독값은 `changed=true`이며 라이브 파이프라인과 같은 이벤트 계약을 따른다.

use gestlink_core::models::gesture::{ActionKind, GestureKind, GestureReading, Handedness};
use gestlink_core::models::session::DemoState;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

/// 고정 재생 시퀀스
pub fn demo_sequence() -> [GestureReading; 5] {
    [
        canned(
            GestureKind::IndexPoint,
            0.92,
            1.5,
            &[("cursor_x", 0.45), ("cursor_y", 0.60)],
            Handedness::Right,
        ),
        canned(GestureKind::Fist, 0.88, 0.8, &[], Handedness::Right),
        canned(GestureKind::ThumbsUp, 0.85, 1.2, &[], Handedness::Right),
        canned(
            GestureKind::OpenHand,
            0.90,
            2.0,
            &[("cursor_x", 0.50), ("cursor_y", 0.55)],
            Handedness::Left,
        ),
        canned(
            GestureKind::Pinch,
            0.78,
            1.8,
            &[("pinch_x", 0.48), ("pinch_y", 0.52), ("distance", 0.03)],
            Handedness::Right,
        ),
    ]
}

fn canned(
    gesture: GestureKind,
    confidence: f64,
    duration_secs: f64,
    details: &[(&str, f64)],
    handedness: Handedness,
) -> GestureReading {
    GestureReading {
        gesture,
        action: gesture.default_action(),
        confidence,
        stable: true,
        changed: true,
        duration_secs,
        details: details
            .iter()
            .map(|(key, value)| (key.to_string(), *value))
            .collect::<BTreeMap<_, _>>(),
        hand_count: 1,
        handedness,
    }
}

/// 데모 시뮬레이터
pub struct DemoSimulator {
    period: Duration,
    sequence: [GestureReading; 5],
    cursor: usize,
    ticker: Option<Interval>,
}

impl DemoSimulator {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            sequence: demo_sequence(),
            cursor: 0,
            ticker: None,
        }
    }

    pub fn state(&self) -> DemoState {
        if self.ticker.is_some() {
            DemoState::Running
        } else {
            DemoState::Idle
        }
    }

    /// 재생 시작 (항상 첫 항목부터). 이미 실행 중이면 `false`.
    pub fn start(&mut self) -> bool {
        if self.ticker.is_some() {
            return false;
        }
        self.cursor = 0;
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
        info!("데모 시작: {}ms 주기", self.period.as_millis());
        true
    }

    /// 재생 중지. 반환 이후 이벤트는 발생하지 않는다.
    pub fn stop(&mut self) -> bool {
        if self.ticker.take().is_none() {
            return false;
        }
        info!("데모 중지");
        true
    }

    /// 현재 항목을 내보내고 커서를 다음으로 옮긴다
    pub fn emit_next(&mut self) -> GestureReading {
        let reading = self.sequence[self.cursor].clone();
        debug!("데모 이벤트 #{}: {}", self.cursor, reading.gesture);
        self.cursor = (self.cursor + 1) % self.sequence.len();
        reading
    }

    /// 다음 주기까지 대기 후 항목 반환. 중지 상태면 영원히 대기한다.
    pub async fn next_reading(&mut self) -> GestureReading {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
        self.emit_next()
    }
}
