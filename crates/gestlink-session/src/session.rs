//! 세션 컨트롤러.
//!
//! 라이브 파이프라인(스케줄러 → 전송 → 디코더)과 데모 시뮬레이터를
//! 하나의 이벤트 계약으로 묶어 소비자에게 전달한다.
//!
//! 모든 타이머, 전송 핸들, 디코더, 메트릭 샘플러는 단일 액터 태스크가 소유하고
//! `tokio::select!`로 다중화한다. 제어 명령은 mpsc로 들어오고 oneshot으로 응답하므로
//! `stop()`이 반환되면 모든 주기 작업은 이미 취소되고 전송은 닫힌 상태다.

use chrono::Utc;
use gestlink_core::config::AppConfig;
use gestlink_core::error::CoreError;
use gestlink_core::models::gesture::{GestureEvent, GestureKind, GestureReading};
use gestlink_core::models::profile::GestureStats;
use gestlink_core::models::session::{
    DemoState, Notice, SessionMetrics, SessionState, TransportState,
};
use gestlink_core::ports::api_client::ProfileApi;
use gestlink_core::ports::camera::CameraSource;
use gestlink_core::ports::consumer::GestureConsumer;
use gestlink_core::ports::transport::{SendOutcome, TransportConnector};
use gestlink_network::decoder::{DecodeError, Decoded, GestureResultDecoder};
use gestlink_network::transport::{TransportEvent, TransportSession};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::demo::DemoSimulator;
use crate::metrics::MetricsSampler;
use crate::scheduler::{CaptureTick, FrameCaptureScheduler};

/// 명령 채널 용량
const COMMAND_CAPACITY: usize = 32;

/// 세션 상태 스냅샷 (표시/진단용)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session: SessionState,
    pub demo: DemoState,
    pub transport: TransportState,
    pub profile_scope: Option<String>,
    /// 표시 중인 현재 제스처 (세션 시작/종료 시 비워짐)
    pub current_gesture: Option<GestureKind>,
    pub current_confidence: Option<f64>,
    /// 마지막 메트릭 보고
    pub metrics: SessionMetrics,
    /// 디코더가 마지막으로 관측한 안정 제스처
    pub last_stable: Option<GestureKind>,
    pub frames_sent: u64,
    pub events_delivered: u64,
    pub decode_errors: u64,
}

/// 제어 명령
enum Command {
    Start(oneshot::Sender<Result<bool, CoreError>>),
    Stop(oneshot::Sender<bool>),
    SetProfile(Option<String>, oneshot::Sender<Result<bool, CoreError>>),
    StartDemo(oneshot::Sender<bool>),
    StopDemo(oneshot::Sender<bool>),
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

/// 세션 제어 핸들. 복제해서 여러 곳에서 사용할 수 있다.
#[derive(Clone)]
pub struct SessionController {
    commands: mpsc::Sender<Command>,
}

impl SessionController {
    /// 캡처 세션 시작 (Idle → Active). 이미 Active면 `false`.
    pub async fn start(&self) -> Result<bool, CoreError> {
        self.request(Command::Start).await?
    }

    /// 캡처 세션 중지 (Active → Idle). 반환 이후 어떤 이벤트도 발생하지 않는다.
    pub async fn stop(&self) -> Result<bool, CoreError> {
        self.request(Command::Stop).await
    }

    /// 프로필 범위 변경. Active면 기존 전송을 닫고 새 범위로 다시 연다.
    pub async fn set_profile(&self, profile_scope: Option<String>) -> Result<bool, CoreError> {
        self.request(|reply| Command::SetProfile(profile_scope, reply))
            .await?
    }

    /// 데모 시작 (Idle → Running)
    pub async fn start_demo(&self) -> Result<bool, CoreError> {
        self.request(Command::StartDemo).await
    }

    /// 데모 중지 (Running → Idle)
    pub async fn stop_demo(&self) -> Result<bool, CoreError> {
        self.request(Command::StopDemo).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, CoreError> {
        self.request(Command::Snapshot).await
    }

    /// 세션과 데모를 모두 중지하고 액터를 종료한다
    pub async fn shutdown(&self) -> Result<(), CoreError> {
        self.request(Command::Shutdown).await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, CoreError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| CoreError::Internal("세션 액터 종료됨".to_string()))?;
        rx.await
            .map_err(|_| CoreError::Internal("세션 액터 응답 없음".to_string()))
    }
}

/// 통계 조회 결과 (세대 번호로 오래된 응답 구분)
struct StatsResult {
    generation: u64,
    result: Result<GestureStats, CoreError>,
}

/// 액터 루프 흐름
#[derive(PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// 세션 런타임 (액터). `spawn`으로 실행하고 [`SessionController`]로 제어한다.
pub struct SessionRuntime {
    config: AppConfig,
    state: SessionState,
    profile_scope: Option<String>,
    scheduler: FrameCaptureScheduler,
    transport: TransportSession,
    decoder: GestureResultDecoder,
    metrics: MetricsSampler,
    last_metrics: SessionMetrics,
    demo: DemoSimulator,
    api: Option<Arc<dyn ProfileApi>>,
    stats_timer: Option<Interval>,
    stats_generation: u64,
    stats_in_flight: bool,
    stats_tx: mpsc::UnboundedSender<StatsResult>,
    stats_rx: mpsc::UnboundedReceiver<StatsResult>,
    consumers: Vec<Arc<dyn GestureConsumer>>,
    current: Option<(GestureKind, f64)>,
    frames_sent: u64,
    events_delivered: u64,
}

impl SessionRuntime {
    /// 새 런타임 생성. 설정은 여기서 한 번 주입된다.
    pub fn new(
        config: AppConfig,
        connector: Arc<dyn TransportConnector>,
        camera: Box<dyn CameraSource>,
    ) -> Self {
        let (stats_tx, stats_rx) = mpsc::unbounded_channel();
        Self {
            scheduler: FrameCaptureScheduler::new(camera, config.capture.interval()),
            transport: TransportSession::new(connector, config.server.base_url.clone()),
            decoder: GestureResultDecoder::new(config.decoder.confidence_policy),
            metrics: MetricsSampler::new(config.metrics.report_interval()),
            demo: DemoSimulator::new(config.demo.interval()),
            config,
            state: SessionState::Idle,
            profile_scope: None,
            last_metrics: SessionMetrics::default(),
            api: None,
            stats_timer: None,
            stats_generation: 0,
            stats_in_flight: false,
            stats_tx,
            stats_rx,
            consumers: Vec::new(),
            current: None,
            frames_sent: 0,
            events_delivered: 0,
        }
    }

    /// 통계 폴링용 API 클라이언트 설정
    pub fn with_api(mut self, api: Arc<dyn ProfileApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// 소비자 추가
    pub fn with_consumer(mut self, consumer: Arc<dyn GestureConsumer>) -> Self {
        self.consumers.push(consumer);
        self
    }

    /// 초기 프로필 범위 설정
    pub fn with_profile(mut self, profile_scope: Option<String>) -> Self {
        self.profile_scope = normalize_scope(profile_scope);
        self
    }

    /// 액터 태스크 실행
    pub fn spawn(self) -> SessionController {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        tokio::spawn(self.run(rx));
        SessionController { commands: tx }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        debug!("세션 액터 시작");
        loop {
            let flow = tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => Flow::Exit,
                },
                tick = self.scheduler.tick() => {
                    self.on_capture_tick(tick);
                    Flow::Continue
                }
                event = self.transport.next_event() => {
                    self.on_transport_event(event);
                    Flow::Continue
                }
                report = self.metrics.report_tick() => {
                    self.on_metrics(report);
                    Flow::Continue
                }
                _ = tick_optional(&mut self.stats_timer) => {
                    self.poll_stats();
                    Flow::Continue
                }
                Some(done) = self.stats_rx.recv() => {
                    self.on_stats(done);
                    Flow::Continue
                }
                reading = self.demo.next_reading() => {
                    self.on_demo_reading(reading);
                    Flow::Continue
                }
            };
            if flow == Flow::Exit {
                break;
            }
        }
        self.stop_session();
        self.demo.stop();
        debug!("세션 액터 종료");
    }

    fn handle_command(&mut self, command: Command) -> Flow {
        match command {
            Command::Start(reply) => {
                let _ = reply.send(self.start_session());
            }
            Command::Stop(reply) => {
                let _ = reply.send(self.stop_session());
            }
            Command::SetProfile(scope, reply) => {
                let _ = reply.send(self.change_profile(scope));
            }
            Command::StartDemo(reply) => {
                if self.state == SessionState::Active {
                    warn!("라이브 세션 활성 중 데모 시작: 같은 소비자에 두 생산자가 이벤트를 보냄");
                }
                let _ = reply.send(self.demo.start());
            }
            Command::StopDemo(reply) => {
                let _ = reply.send(self.demo.stop());
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown(reply) => {
                self.stop_session();
                self.demo.stop();
                let _ = reply.send(());
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    fn start_session(&mut self) -> Result<bool, CoreError> {
        if self.state == SessionState::Active {
            debug!("세션 이미 활성, 시작 무시");
            return Ok(false);
        }

        self.transport.open(self.profile_scope.clone())?;
        self.notify_connection();

        self.state = SessionState::Active;
        self.current = None;
        self.decoder.reset();
        self.last_metrics = SessionMetrics::default();
        self.scheduler.start();
        self.metrics.start();
        self.start_stats_timer();

        info!(
            "세션 시작 (프로필: {})",
            self.profile_scope.as_deref().unwrap_or("없음")
        );
        Ok(true)
    }

    fn stop_session(&mut self) -> bool {
        if self.state == SessionState::Idle {
            return false;
        }

        self.scheduler.stop();
        self.metrics.stop();
        self.stop_stats_timer();

        let was_connected = !self.transport.state().is_reopenable();
        self.transport.close();
        if was_connected {
            self.notify_connection();
        }

        self.state = SessionState::Idle;
        self.current = None;
        self.last_metrics = SessionMetrics::default();
        info!(
            "세션 중지 (전송 {}프레임, 이벤트 {}건)",
            self.frames_sent, self.events_delivered
        );
        true
    }

    fn change_profile(&mut self, scope: Option<String>) -> Result<bool, CoreError> {
        let scope = normalize_scope(scope);
        if scope == self.profile_scope {
            return Ok(false);
        }
        info!(
            "프로필 변경: {} → {}",
            self.profile_scope.as_deref().unwrap_or("없음"),
            scope.as_deref().unwrap_or("없음")
        );

        if self.state == SessionState::Active {
            // 새 연결이 열리기 전까지 프레임은 폐기된다
            let before = self.transport.state();
            self.transport.close();
            if self.transport.state() != before {
                self.notify_connection();
            }
            // 열기 실패 시 범위는 이전 값 유지
            self.transport.open(scope.clone())?;
            self.profile_scope = scope;
            self.notify_connection();
            self.start_stats_timer();
        } else {
            self.profile_scope = scope;
        }
        Ok(true)
    }

    fn on_capture_tick(&mut self, tick: CaptureTick) {
        match tick.degraded_change {
            Some(true) => self.notify(Notice::warning("카메라 프레임 없음: 캡처 저하 상태")),
            Some(false) => self.notify(Notice::info("카메라 프레임 복구")),
            None => {}
        }

        let Some(frame) = tick.frame else {
            return;
        };
        if self.transport.send(&frame) == SendOutcome::Sent {
            self.metrics.record_send();
            self.frames_sent += 1;
        }
    }

    fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened { url } => {
                debug!("전송 연결: {url}");
                self.notify_connection();
            }
            TransportEvent::Message(text) => {
                self.metrics.record_receive();
                let decoded = self.decoder.decode(&text);
                self.on_decoded(decoded);
            }
            TransportEvent::Binary(data) => {
                self.metrics.record_receive();
                let decoded = self.decoder.decode_bytes(&data);
                self.on_decoded(decoded);
            }
            TransportEvent::Closed => {
                self.notify_connection();
                self.notify(Notice::warning("서버 연결 종료됨 (다시 시작 필요)"));
            }
            TransportEvent::Failed(reason) => {
                self.notify_connection();
                self.notify(Notice::error(format!("서버 연결 끊김: {reason}")));
            }
        }
    }

    fn on_decoded(&mut self, decoded: Result<Decoded, DecodeError>) {
        match decoded {
            Ok(Decoded::Reading(reading)) => {
                self.current = Some((reading.gesture, reading.confidence));
                if reading.changed {
                    self.deliver(reading);
                }
            }
            Ok(Decoded::ServerError(message)) => {
                warn!("서버 처리 실패: {message}");
                self.notify(Notice::warning(format!("서버 처리 실패: {message}")));
            }
            Err(e) => {
                warn!("디코딩 에러, 메시지 폐기: {e}");
                self.notify(Notice::warning(format!("잘못된 결과 메시지: {e}")));
            }
        }
    }

    fn on_demo_reading(&mut self, reading: GestureReading) {
        self.deliver(reading);
    }

    fn deliver(&mut self, reading: GestureReading) {
        let event = GestureEvent::stamp(reading, Utc::now());
        debug!(
            "제스처 이벤트: {} → {} ({:.2})",
            event.gesture(),
            event.action(),
            event.confidence()
        );
        self.events_delivered += 1;
        for consumer in &self.consumers {
            consumer.on_gesture(&event);
        }
    }

    fn on_metrics(&mut self, report: SessionMetrics) {
        self.last_metrics = report;
        for consumer in &self.consumers {
            consumer.on_metrics(&report);
        }
    }

    fn start_stats_timer(&mut self) {
        self.stats_generation += 1;
        self.stats_in_flight = false;
        if !self.config.stats.enabled || self.api.is_none() {
            self.stats_timer = None;
            return;
        }
        // 첫 틱은 즉시
        let mut timer = interval(self.config.stats.poll_interval());
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.stats_timer = Some(timer);
    }

    fn stop_stats_timer(&mut self) {
        self.stats_timer = None;
        self.stats_generation += 1;
        self.stats_in_flight = false;
    }

    fn poll_stats(&mut self) {
        let Some(api) = self.api.as_ref() else {
            return;
        };
        if self.stats_in_flight {
            debug!("이전 통계 조회 진행 중, 이번 주기 건너뜀");
            return;
        }
        self.stats_in_flight = true;

        let api = Arc::clone(api);
        let tx = self.stats_tx.clone();
        let generation = self.stats_generation;
        let scope = self.profile_scope.clone();
        tokio::spawn(async move {
            let result = api.gesture_stats(scope.as_deref()).await;
            let _ = tx.send(StatsResult { generation, result });
        });
    }

    fn on_stats(&mut self, done: StatsResult) {
        if done.generation != self.stats_generation {
            debug!("이전 세대 통계 응답 무시");
            return;
        }
        self.stats_in_flight = false;

        let stats = match done.result {
            Ok(stats) => stats,
            Err(e) => {
                warn!("통계 조회 실패: {e}");
                self.notify(Notice::warning(format!("통계 조회 실패: {e}")));
                GestureStats::empty()
            }
        };
        for consumer in &self.consumers {
            consumer.on_stats(&stats);
        }
    }

    fn notify_connection(&self) {
        let state = self.transport.state();
        for consumer in &self.consumers {
            consumer.on_connection(state);
        }
    }

    fn notify(&self, notice: Notice) {
        for consumer in &self.consumers {
            consumer.on_notice(&notice);
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session: self.state,
            demo: self.demo.state(),
            transport: self.transport.state(),
            profile_scope: self.profile_scope.clone(),
            current_gesture: self.current.map(|(gesture, _)| gesture),
            current_confidence: self.current.map(|(_, confidence)| confidence),
            metrics: self.last_metrics,
            last_stable: self.decoder.last_stable(),
            frames_sent: self.frames_sent,
            events_delivered: self.events_delivered,
            decode_errors: self.decoder.rejected_count(),
        }
    }
}

/// 빈 문자열 범위는 범위 없음으로 취급
fn normalize_scope(scope: Option<String>) -> Option<String> {
    scope.filter(|id| !id.trim().is_empty())
}

/// 타이머가 없으면 영원히 대기
async fn tick_optional(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// 설정 간격을 사람이 읽기 쉬운 형태로
pub fn describe_intervals(config: &AppConfig) -> String {
    let ms = |d: Duration| d.as_millis();
    format!(
        "캡처 {}ms, 메트릭 {}ms, 통계 {}ms, 데모 {}ms",
        ms(config.capture.interval()),
        ms(config.metrics.report_interval()),
        ms(config.stats.poll_interval()),
        ms(config.demo.interval())
    )
}
