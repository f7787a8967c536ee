//! 세션 메트릭 샘플러.
//!
//! 전송 성공 프레임 수(fps)와 근사 왕복 지연을 관측한다.
//! 표시 전용이며 스케줄링/전송 동작에 관여하지 않는다.

use gestlink_core::models::session::SessionMetrics;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// 메트릭 샘플러
pub struct MetricsSampler {
    period: Duration,
    ticker: Option<Interval>,
    sent_in_window: u32,
    /// 응답을 아직 받지 못한 가장 최근 송신 시각
    last_send_at: Option<Instant>,
    latency: Option<Duration>,
}

impl MetricsSampler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            ticker: None,
            sent_in_window: 0,
            last_send_at: None,
            latency: None,
        }
    }

    /// 보고 주기 시작. 관측값은 초기화된다.
    pub fn start(&mut self) {
        self.reset();
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
    }

    /// 보고 중지. 이후 보고는 발생하지 않는다.
    pub fn stop(&mut self) {
        self.ticker = None;
        self.reset();
    }

    /// 송신 성공 기록
    pub fn record_send(&mut self) {
        self.sent_in_window = self.sent_in_window.saturating_add(1);
        self.last_send_at = Some(Instant::now());
    }

    /// 결과 수신 기록. 가장 최근 송신 이후 첫 결과만 지연 샘플이 된다.
    pub fn record_receive(&mut self) {
        if let Some(sent_at) = self.last_send_at.take() {
            self.latency = Some(sent_at.elapsed());
        }
    }

    /// 현재 관측값 (윈도우 리셋 없음)
    pub fn current(&self) -> SessionMetrics {
        SessionMetrics {
            fps: self.sent_in_window,
            latency_ms: self.latency_ms(),
        }
    }

    /// 다음 보고 시점까지 대기 후 윈도우 값을 보고하고 카운터를 리셋한다.
    /// 중지 상태면 영원히 대기한다.
    pub async fn report_tick(&mut self) -> SessionMetrics {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
        let report = self.current();
        self.sent_in_window = 0;
        report
    }

    fn latency_ms(&self) -> Option<u64> {
        self.latency
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    fn reset(&mut self) {
        self.sent_in_window = 0;
        self.last_send_at = None;
        self.latency = None;
    }
}
