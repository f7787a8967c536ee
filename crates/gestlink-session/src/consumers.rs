//! 기본 제공 이벤트 소비자.
//!
//! - [`RecentGestures`]: 최근 제스처 10개 (최신순)
//! - [`GestureTally`]: 세션 중 제스처별 누적 횟수
//! - [`JsonLinesPrinter`]: 모든 세션 이벤트를 JSON 한 줄씩 출력

use gestlink_core::models::gesture::{GestureEvent, GestureKind};
use gestlink_core::models::profile::GestureStats;
use gestlink_core::models::session::{Notice, SessionMetrics, TransportState};
use gestlink_core::ports::consumer::GestureConsumer;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::io::Write;
use tracing::warn;

/// 최근 목록 기본 크기
pub const RECENT_CAPACITY: usize = 10;

/// 최근 제스처 목록
pub struct RecentGestures {
    capacity: usize,
    events: Mutex<VecDeque<GestureEvent>>,
}

impl RecentGestures {
    pub fn new() -> Self {
        Self::with_capacity(RECENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// 최신순 목록
    pub fn snapshot(&self) -> Vec<GestureEvent> {
        self.events.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl Default for RecentGestures {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureConsumer for RecentGestures {
    fn on_gesture(&self, event: &GestureEvent) {
        let mut events = self.events.lock();
        events.push_front(event.clone());
        events.truncate(self.capacity);
    }
}

/// 제스처별 누적 횟수
#[derive(Default)]
pub struct GestureTally {
    counts: Mutex<BTreeMap<GestureKind, u64>>,
}

impl GestureTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, gesture: GestureKind) -> u64 {
        self.counts.lock().get(&gesture).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.lock().values().sum()
    }

    /// 횟수 내림차순
    pub fn sorted(&self) -> Vec<(GestureKind, u64)> {
        let mut counts: Vec<_> = self.counts.lock().iter().map(|(g, c)| (*g, *c)).collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }
}

impl GestureConsumer for GestureTally {
    fn on_gesture(&self, event: &GestureEvent) {
        *self.counts.lock().entry(event.gesture()).or_insert(0) += 1;
    }
}

/// 출력 한 줄
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputLine<'a> {
    Gesture(&'a GestureEvent),
    Metrics(&'a SessionMetrics),
    Connection { state: TransportState },
    Stats(&'a GestureStats),
    Notice(&'a Notice),
}

/// JSON Lines 출력 소비자
pub struct JsonLinesPrinter<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn write_line(&self, line: &OutputLine<'_>) {
        let text = match serde_json::to_string(line) {
            Ok(text) => text,
            Err(e) => {
                warn!("출력 직렬화 실패: {e}");
                return;
            }
        };
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "{text}").and_then(|_| out.flush()) {
            warn!("출력 실패: {e}");
        }
    }
}

impl<W: Write + Send> GestureConsumer for JsonLinesPrinter<W> {
    fn on_gesture(&self, event: &GestureEvent) {
        self.write_line(&OutputLine::Gesture(event));
    }

    fn on_metrics(&self, metrics: &SessionMetrics) {
        self.write_line(&OutputLine::Metrics(metrics));
    }

    fn on_connection(&self, state: TransportState) {
        self.write_line(&OutputLine::Connection { state });
    }

    fn on_stats(&self, stats: &GestureStats) {
        self.write_line(&OutputLine::Stats(stats));
    }

    fn on_notice(&self, notice: &Notice) {
        self.write_line(&OutputLine::Notice(notice));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gestlink_core::models::gesture::GestureReading;

    fn event(gesture: GestureKind) -> GestureEvent {
        let mut reading = GestureReading::no_hand();
        reading.gesture = gesture;
        reading.action = gesture.default_action();
        reading.confidence = 0.9;
        reading.changed = true;
        GestureEvent::stamp(reading, Utc::now())
    }

    #[test]
    fn recent_keeps_newest_first_and_caps() {
        let recent = RecentGestures::new();
        for i in 0..12 {
            let gesture = if i % 2 == 0 {
                GestureKind::Fist
            } else {
                GestureKind::Pinch
            };
            recent.on_gesture(&event(gesture));
        }
        let list = recent.snapshot();
        assert_eq!(list.len(), RECENT_CAPACITY);
        // 마지막(i=11)은 pinch
        assert_eq!(list[0].gesture(), GestureKind::Pinch);
        assert_eq!(list[1].gesture(), GestureKind::Fist);
    }

    #[test]
    fn tally_counts_per_gesture() {
        let tally = GestureTally::new();
        tally.on_gesture(&event(GestureKind::Fist));
        tally.on_gesture(&event(GestureKind::Fist));
        tally.on_gesture(&event(GestureKind::OpenHand));

        assert_eq!(tally.count(GestureKind::Fist), 2);
        assert_eq!(tally.total(), 3);
        assert_eq!(tally.sorted()[0], (GestureKind::Fist, 2));
    }

    #[test]
    fn printer_writes_tagged_lines() {
        let printer = JsonLinesPrinter::new(Vec::new());
        printer.on_gesture(&event(GestureKind::ThumbsUp));
        printer.on_connection(TransportState::Open);
        printer.on_metrics(&SessionMetrics {
            fps: 10,
            latency_ms: Some(35),
        });

        let output = String::from_utf8(printer.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["type"], "gesture");
        assert_eq!(lines[0]["gesture"], "thumbs_up");
        assert_eq!(lines[0]["action"], "right_click");
        assert_eq!(lines[1]["state"], "Open");
        assert_eq!(lines[2]["fps"], 10);
    }
}
