//! 인프로세스 루프백 커넥터.
//!
//! 실제 서버 없이 전송 세션을 구동한다. 연결마다 [`LoopbackPeer`]가 생기며,
//! 피어를 통해 송신된 메시지를 확인하고 수신 메시지/원격 종료/에러를 주입할 수 있다.
//! 응답기(responder)를 등록하면 송신마다 자동으로 응답을 돌려준다.

use async_trait::async_trait;
use gestlink_core::error::CoreError;
use gestlink_core::ports::transport::{
    InboundMessage, SendOutcome, TransportConnector, TransportLink, TransportSink,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// 수신 채널 용량
const INBOUND_CAPACITY: usize = 256;

/// 송신 텍스트 → 응답 텍스트
pub type Responder = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// 루프백 연결의 원격 측 핸들
#[derive(Clone)]
pub struct LoopbackPeer {
    url: String,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    inbound: mpsc::Sender<InboundMessage>,
}

impl LoopbackPeer {
    /// 연결 URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// 이 연결로 송신된 메시지 목록
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// 로컬 측이 연결을 닫았는지
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// 텍스트 메시지 주입. 수신 측이 사라졌으면 false.
    pub fn push(&self, text: impl Into<String>) -> bool {
        self.inbound
            .try_send(InboundMessage::Text(text.into()))
            .is_ok()
    }

    /// 바이너리 메시지 주입
    pub fn push_binary(&self, data: impl Into<Vec<u8>>) -> bool {
        self.inbound
            .try_send(InboundMessage::Binary(data.into()))
            .is_ok()
    }

    /// 원격 종료 주입
    pub fn close_remote(&self) -> bool {
        self.inbound.try_send(InboundMessage::Closed).is_ok()
    }

    /// 전송 에러 주입
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.inbound
            .try_send(InboundMessage::Error(reason.into()))
            .is_ok()
    }
}

/// 루프백 커넥터
#[derive(Clone, Default)]
pub struct LoopbackConnector {
    peers: Arc<Mutex<Vec<LoopbackPeer>>>,
    refuse: Arc<AtomicBool>,
    responder: Option<Responder>,
}

impl LoopbackConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 송신마다 응답을 돌려주는 응답기 등록
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.responder = Some(Arc::new(responder));
        self
    }

    /// 이후 연결 시도를 거부할지 설정
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// 지금까지 수립된 연결들 (오래된 순)
    pub fn peers(&self) -> Vec<LoopbackPeer> {
        self.peers.lock().clone()
    }

    /// 가장 최근 연결
    pub fn last_peer(&self) -> Option<LoopbackPeer> {
        self.peers.lock().last().cloned()
    }

    pub fn connect_count(&self) -> usize {
        self.peers.lock().len()
    }
}

#[async_trait]
impl TransportConnector for LoopbackConnector {
    async fn connect(&self, url: &str) -> Result<TransportLink, CoreError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(CoreError::Transport(format!("루프백 연결 거부: {url}")));
        }

        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        let peer = LoopbackPeer {
            url: url.to_string(),
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
            inbound: tx,
        };
        self.peers.lock().push(peer.clone());
        debug!("루프백 연결 수립: {url}");

        Ok(TransportLink {
            sink: Box::new(LoopbackSink {
                peer,
                responder: self.responder.clone(),
            }),
            inbound: rx,
        })
    }
}

struct LoopbackSink {
    peer: LoopbackPeer,
    responder: Option<Responder>,
}

impl TransportSink for LoopbackSink {
    fn try_send(&self, text: String) -> Result<SendOutcome, CoreError> {
        if self.peer.is_closed() {
            return Err(CoreError::Transport("이미 종료된 루프백 연결".to_string()));
        }
        let reply = self.responder.as_ref().and_then(|respond| respond(&text));
        self.peer.sent.lock().push(text);
        if let Some(reply) = reply {
            self.peer.push(reply);
        }
        Ok(SendOutcome::Sent)
    }

    fn close(&self) {
        self.peer.closed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_sent_and_replies() {
        let connector =
            LoopbackConnector::new().with_responder(|text| Some(format!("echo:{text}")));
        let mut link = connector.connect("ws://loopback/ws/gestures").await.unwrap();

        assert_eq!(link.sink.try_send("hello".to_string()).unwrap(), SendOutcome::Sent);
        assert_eq!(
            link.inbound.recv().await,
            Some(InboundMessage::Text("echo:hello".to_string()))
        );

        let peer = connector.last_peer().unwrap();
        assert_eq!(peer.sent(), vec!["hello".to_string()]);
        assert_eq!(peer.url(), "ws://loopback/ws/gestures");
    }

    #[tokio::test]
    async fn refused_connect_is_error() {
        let connector = LoopbackConnector::new();
        connector.set_refuse(true);
        assert!(connector.connect("ws://loopback").await.is_err());
        assert_eq!(connector.connect_count(), 0);
    }

    #[tokio::test]
    async fn closed_sink_rejects_sends() {
        let connector = LoopbackConnector::new();
        let link = connector.connect("ws://loopback").await.unwrap();
        link.sink.close();

        assert!(connector.last_peer().unwrap().is_closed());
        assert!(link.sink.try_send("late".to_string()).is_err());
    }
}
