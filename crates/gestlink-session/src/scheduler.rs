//! 프레임 캡처 스케줄러.
//!
//! 고정 주기(기본 100ms)로 카메라 소스에서 현재 프레임을 가져온다.
//! 프레임이 없으면 해당 틱은 에러 없이 건너뛴다. 연속으로 비면 저하 상태로 본다.

use gestlink_core::models::frame::CaptureFrame;
use gestlink_core::ports::camera::CameraSource;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// 저하 상태로 판단하는 연속 빈 틱 수
pub const DEGRADED_AFTER_EMPTY_TICKS: u32 = 10;

/// 틱 한 번의 결과
#[derive(Debug)]
pub struct CaptureTick {
    /// 획득한 프레임 (없으면 건너뛴 틱)
    pub frame: Option<CaptureFrame>,
    /// 저하 상태 진입(`Some(true)`) / 해제(`Some(false)`)
    pub degraded_change: Option<bool>,
}

/// 프레임 캡처 스케줄러
pub struct FrameCaptureScheduler {
    period: Duration,
    camera: Box<dyn CameraSource>,
    ticker: Option<Interval>,
    next_seq: u64,
    empty_ticks: u32,
    degraded: bool,
}

impl FrameCaptureScheduler {
    pub fn new(camera: Box<dyn CameraSource>, period: Duration) -> Self {
        Self {
            period,
            camera,
            ticker: None,
            next_seq: 0,
            empty_ticks: 0,
            degraded: false,
        }
    }

    /// 캡처 시작. 첫 틱은 한 주기 뒤. 이미 실행 중이면 `false`.
    ///
    /// 시퀀스 번호는 0부터 다시 시작한다.
    pub fn start(&mut self) -> bool {
        if self.ticker.is_some() {
            return false;
        }
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.ticker = Some(ticker);
        self.next_seq = 0;
        self.empty_ticks = 0;
        self.degraded = false;
        info!(
            "캡처 시작: {}ms 주기, 소스={}",
            self.period.as_millis(),
            self.camera.describe()
        );
        true
    }

    /// 캡처 중지. 반환 이후 틱은 발생하지 않는다.
    pub fn stop(&mut self) -> bool {
        if self.ticker.take().is_none() {
            return false;
        }
        info!("캡처 중지 ({}개 프레임 생성)", self.next_seq);
        true
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// 다음 틱 대기 후 프레임 획득. 중지 상태면 영원히 대기한다.
    ///
    /// 취소 안전: 틱 대기 이후의 처리는 동기적이다.
    pub async fn tick(&mut self) -> CaptureTick {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
        self.capture()
    }

    fn capture(&mut self) -> CaptureTick {
        match self.camera.current_frame() {
            Some(jpeg) => {
                let frame = CaptureFrame::new(self.next_seq, jpeg);
                self.next_seq += 1;
                self.empty_ticks = 0;
                let degraded_change = if self.degraded {
                    self.degraded = false;
                    info!("카메라 프레임 복구");
                    Some(false)
                } else {
                    None
                };
                debug!("프레임 캡처 #{} ({} bytes)", frame.seq, frame.jpeg.len());
                CaptureTick {
                    frame: Some(frame),
                    degraded_change,
                }
            }
            None => {
                self.empty_ticks = self.empty_ticks.saturating_add(1);
                let degraded_change =
                    if !self.degraded && self.empty_ticks >= DEGRADED_AFTER_EMPTY_TICKS {
                        self.degraded = true;
                        warn!("카메라 프레임 없음: 연속 {}틱 건너뜀", self.empty_ticks);
                        Some(true)
                    } else {
                        None
                    };
                CaptureTick {
                    frame: None,
                    degraded_change,
                }
            }
        }
    }
}
