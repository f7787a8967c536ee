//! 제스처 전송 세션.
//!
//! 백엔드 인식 엔드포인트와의 단일 양방향 연결을 소유하는 상태 머신.
//! 연결 수립은 별도 태스크에서 진행되고 결과는 세대 번호와 함께 되돌아온다.
//! 닫힌 뒤 도착한 연결 결과(이전 세대)는 즉시 닫고 버린다.

use gestlink_core::error::CoreError;
use gestlink_core::models::frame::CaptureFrame;
use gestlink_core::models::session::TransportState;
use gestlink_core::ports::transport::{
    InboundMessage, SendOutcome, TransportConnector, TransportLink, TransportSink,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// 제스처 스트림 경로
pub const GESTURE_WS_PATH: &str = "/ws/gestures";

/// 프로필 범위 쿼리 파라미터
const PROFILE_QUERY_KEY: &str = "profile_id";

/// 기본 URL로부터 제스처 WebSocket 엔드포인트 구성
///
/// `http` → `ws`, `https` → `wss`. 기본 URL의 경로는 무시하고 호스트만 사용한다.
pub fn gesture_endpoint(base_url: &str, profile_scope: Option<&str>) -> Result<Url, CoreError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| CoreError::Config(format!("서버 URL 파싱 실패: {base_url}: {e}")))?;

    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(CoreError::Config(format!(
                "지원하지 않는 URL 스킴: {other}"
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| CoreError::Config(format!("URL 스킴 변경 실패: {base_url}")))?;
    url.set_path(GESTURE_WS_PATH);
    url.set_query(None);
    url.set_fragment(None);

    if let Some(profile_id) = profile_scope.filter(|id| !id.is_empty()) {
        url.query_pairs_mut().append_pair(PROFILE_QUERY_KEY, profile_id);
    }
    Ok(url)
}

/// 프레임 전송 메시지 (`{"image": "data:image/jpeg;base64,..."}`)
#[derive(Serialize)]
struct FrameMessage<'a> {
    image: &'a str,
}

/// 프레임을 전송 메시지 텍스트로 직렬화
pub fn frame_message(frame: &CaptureFrame) -> Result<String, CoreError> {
    let data_url = frame.to_data_url();
    Ok(serde_json::to_string(&FrameMessage { image: &data_url })?)
}

/// 전송 세션이 보고하는 이벤트
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// 연결 수립 (Connecting → Open)
    Opened { url: String },
    /// 수신 텍스트 메시지 (원문 그대로)
    Message(String),
    /// 수신 바이너리 메시지 (UTF-8 검증은 디코더 몫)
    Binary(Vec<u8>),
    /// 원격 측 종료 (Open → Closing → Closed)
    Closed,
    /// 연결 실패 또는 전송 에러 (→ Disconnected)
    Failed(String),
}

/// 연결 태스크 결과
struct ConnectResult {
    generation: u64,
    url: String,
    result: Result<TransportLink, CoreError>,
}

/// 처리 단계 (select 결과)
enum Step {
    Connected(ConnectResult),
    Inbound(Option<InboundMessage>),
}

/// 전송 세션
pub struct TransportSession {
    connector: Arc<dyn TransportConnector>,
    base_url: String,
    state: TransportState,
    profile_scope: Option<String>,
    /// 연결 시도마다 증가. 닫기도 증가시켜 진행 중 시도를 무효화한다.
    generation: u64,
    sink: Option<Box<dyn TransportSink>>,
    inbound: Option<mpsc::Receiver<InboundMessage>>,
    pending: Option<JoinHandle<()>>,
    connect_tx: mpsc::UnboundedSender<ConnectResult>,
    connect_rx: mpsc::UnboundedReceiver<ConnectResult>,
}

impl TransportSession {
    /// 새 전송 세션 생성 (Disconnected)
    pub fn new(connector: Arc<dyn TransportConnector>, base_url: impl Into<String>) -> Self {
        let (connect_tx, connect_rx) = mpsc::unbounded_channel();
        Self {
            connector,
            base_url: base_url.into(),
            state: TransportState::Disconnected,
            profile_scope: None,
            generation: 0,
            sink: None,
            inbound: None,
            pending: None,
            connect_tx,
            connect_rx,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == TransportState::Open
    }

    /// 현재(또는 마지막) 연결의 프로필 범위
    pub fn profile_scope(&self) -> Option<&str> {
        self.profile_scope.as_deref()
    }

    /// 연결 시작. 이미 Connecting/Open/Closing이면 아무것도 하지 않고 `false`.
    ///
    /// URL 구성 실패 시 상태는 바뀌지 않는다.
    pub fn open(&mut self, profile_scope: Option<String>) -> Result<bool, CoreError> {
        if !self.state.is_reopenable() {
            debug!("전송 세션 이미 활성 ({}), 열기 무시", self.state);
            return Ok(false);
        }

        let url = gesture_endpoint(&self.base_url, profile_scope.as_deref())?.to_string();
        self.profile_scope = profile_scope;
        self.generation += 1;
        self.transition(TransportState::Connecting);

        let connector = Arc::clone(&self.connector);
        let tx = self.connect_tx.clone();
        let generation = self.generation;
        self.pending = Some(tokio::spawn(async move {
            let result = connector.connect(&url).await;
            let _ = tx.send(ConnectResult {
                generation,
                url,
                result,
            });
        }));
        Ok(true)
    }

    /// 프레임 송신. Open이 아니면 조용히 폐기한다.
    pub fn send(&mut self, frame: &CaptureFrame) -> SendOutcome {
        let Some(sink) = self.sink.as_ref().filter(|_| self.is_open()) else {
            debug!("전송 세션 {} 상태, 프레임 #{} 폐기", self.state, frame.seq);
            return SendOutcome::Dropped;
        };

        let payload = match frame_message(frame) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("프레임 직렬화 실패: {e}");
                return SendOutcome::Dropped;
            }
        };

        match sink.try_send(payload) {
            Ok(outcome) => {
                if outcome == SendOutcome::Dropped {
                    debug!("송신 대기 중인 프레임 있음, 프레임 #{} 폐기", frame.seq);
                }
                outcome
            }
            Err(e) => {
                // 실제 연결 종료는 수신 경로로 보고된다
                warn!("프레임 송신 실패: {e}");
                SendOutcome::Dropped
            }
        }
    }

    /// 로컬 종료. 반환 시점에 Closed이며 이후 수신 메시지는 전달되지 않는다.
    pub fn close(&mut self) {
        match self.state {
            TransportState::Connecting => {
                if let Some(handle) = self.pending.take() {
                    handle.abort();
                }
                self.generation += 1;
                self.transition(TransportState::Closing);
                self.transition(TransportState::Closed);
            }
            TransportState::Open => {
                self.transition(TransportState::Closing);
                self.release_link();
                self.generation += 1;
                self.transition(TransportState::Closed);
            }
            TransportState::Closing | TransportState::Closed | TransportState::Disconnected => {
                debug!("전송 세션 {} 상태, 닫기 무시", self.state);
            }
        }
    }

    /// 다음 전송 이벤트 대기. 취소 안전 (select 분기에서 사용 가능).
    pub async fn next_event(&mut self) -> TransportEvent {
        loop {
            let step = {
                let inbound = &mut self.inbound;
                let connect_rx = &mut self.connect_rx;
                tokio::select! {
                    Some(done) = connect_rx.recv() => Step::Connected(done),
                    message = recv_inbound(inbound) => Step::Inbound(message),
                }
            };

            let event = match step {
                Step::Connected(done) => self.on_connect_result(done),
                Step::Inbound(message) => self.on_inbound(message),
            };
            if let Some(event) = event {
                return event;
            }
        }
    }

    fn on_connect_result(&mut self, done: ConnectResult) -> Option<TransportEvent> {
        if done.generation != self.generation || self.state != TransportState::Connecting {
            if let Ok(link) = done.result {
                debug!("이전 세대 연결 결과 도착, 닫음 (세대 {})", done.generation);
                link.sink.close();
            }
            return None;
        }

        self.pending = None;
        match done.result {
            Ok(link) => {
                self.sink = Some(link.sink);
                self.inbound = Some(link.inbound);
                self.transition(TransportState::Open);
                info!("전송 세션 연결됨");
                Some(TransportEvent::Opened { url: done.url })
            }
            Err(e) => {
                warn!("전송 세션 연결 실패: {e}");
                self.transition(TransportState::Disconnected);
                Some(TransportEvent::Failed(e.to_string()))
            }
        }
    }

    fn on_inbound(&mut self, message: Option<InboundMessage>) -> Option<TransportEvent> {
        match message {
            Some(InboundMessage::Text(text)) => Some(TransportEvent::Message(text)),
            Some(InboundMessage::Binary(data)) => Some(TransportEvent::Binary(data)),
            Some(InboundMessage::Closed) | None => {
                info!("전송 세션 원격 종료");
                self.transition(TransportState::Closing);
                self.release_link();
                self.transition(TransportState::Closed);
                Some(TransportEvent::Closed)
            }
            Some(InboundMessage::Error(reason)) => {
                warn!("전송 에러: {reason}");
                self.release_link();
                self.transition(TransportState::Disconnected);
                Some(TransportEvent::Failed(reason))
            }
        }
    }

    fn release_link(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.close();
        }
        self.inbound = None;
    }

    fn transition(&mut self, next: TransportState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "잘못된 전송 상태 전이: {} → {}",
            self.state,
            next
        );
        debug!("전송 상태: {} → {}", self.state, next);
        self.state = next;
    }
}

impl Drop for TransportSession {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        if let Some(sink) = self.sink.take() {
            sink.close();
        }
    }
}

/// 수신 채널이 없으면 영원히 대기
async fn recv_inbound(inbound: &mut Option<mpsc::Receiver<InboundMessage>>) -> Option<InboundMessage> {
    match inbound {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
