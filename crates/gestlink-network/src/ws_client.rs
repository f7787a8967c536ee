//! WebSocket 커넥터.
//!
//! `tokio-tungstenite` 기반 `TransportConnector` 구현.
//! 수신/송신 루프를 별도 태스크로 돌리고, 송신은 용량 1의 채널을 통해
//! 대기 없이 시도한다 (가득 차 있으면 폐기).

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use gestlink_core::error::CoreError;
use gestlink_core::ports::transport::{
    InboundMessage, SendOutcome, TransportConnector, TransportLink, TransportSink,
};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 수신 채널 용량
const INBOUND_CAPACITY: usize = 64;

/// 기본 송신 채널 용량 (프레임 1개 초과분은 폐기)
const DEFAULT_OUTBOUND_CAPACITY: usize = 1;

/// WebSocket 커넥터
pub struct WsConnector {
    outbound_capacity: usize,
}

impl WsConnector {
    /// 새 커넥터 생성
    pub fn new() -> Self {
        Self {
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }

    /// 송신 채널 용량 설정
    pub fn with_outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity.max(1);
        self
    }

    /// 수신 루프
    async fn read_loop(mut read: SplitStream<WsStream>, tx: mpsc::Sender<InboundMessage>) {
        while let Some(msg) = read.next().await {
            let forwarded = match msg {
                Ok(Message::Text(text)) => InboundMessage::Text(text.to_string()),
                Ok(Message::Binary(data)) => InboundMessage::Binary(data.to_vec()),
                Ok(Message::Close(_)) => {
                    let _ = tx.send(InboundMessage::Closed).await;
                    debug!("WebSocket 원격 종료 수신");
                    return;
                }
                Ok(_) => continue, // Ping/Pong은 자동 처리
                Err(e) => {
                    warn!("WebSocket 수신 에러: {e}");
                    let _ = tx.send(InboundMessage::Error(e.to_string())).await;
                    return;
                }
            };
            if tx.send(forwarded).await.is_err() {
                // 세션이 수신 채널을 놓음 (로컬 종료)
                debug!("WebSocket 수신 루프 종료 (수신자 없음)");
                return;
            }
        }
        let _ = tx.send(InboundMessage::Closed).await;
        debug!("WebSocket 수신 루프 종료 (스트림 끝)");
    }

    /// 송신 루프. 송신 핸들이 모두 사라지면 Close 프레임을 보내고 끝낸다.
    async fn write_loop(mut write: SplitSink<WsStream, Message>, mut rx: mpsc::Receiver<String>) {
        while let Some(text) = rx.recv().await {
            if let Err(e) = write.send(Message::Text(text.into())).await {
                warn!("WebSocket 전송 실패: {e}");
                return;
            }
        }
        if let Err(e) = write.send(Message::Close(None)).await {
            debug!("WebSocket 종료 프레임 전송 실패: {e}");
        }
        debug!("WebSocket 송신 루프 종료");
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransportConnector for WsConnector {
    async fn connect(&self, url: &str) -> Result<TransportLink, CoreError> {
        info!("WebSocket 연결: {}", url.split('?').next().unwrap_or(url));

        let (ws_stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| CoreError::Transport(format!("WebSocket 연결 실패: {e}")))?;

        let (write, read) = ws_stream.split();
        let (in_tx, in_rx) = mpsc::channel(INBOUND_CAPACITY);
        let (out_tx, out_rx) = mpsc::channel(self.outbound_capacity);

        tokio::spawn(Self::read_loop(read, in_tx));
        tokio::spawn(Self::write_loop(write, out_rx));

        Ok(TransportLink {
            sink: Box::new(WsSink {
                tx: Mutex::new(Some(out_tx)),
            }),
            inbound: in_rx,
        })
    }
}

/// WebSocket 송신 핸들
struct WsSink {
    /// `None`이면 로컬 종료됨
    tx: Mutex<Option<mpsc::Sender<String>>>,
}

impl TransportSink for WsSink {
    fn try_send(&self, text: String) -> Result<SendOutcome, CoreError> {
        let guard = self.tx.lock();
        let tx = guard
            .as_ref()
            .ok_or_else(|| CoreError::Transport("이미 종료된 연결".to_string()))?;
        match tx.try_send(text) {
            Ok(()) => Ok(SendOutcome::Sent),
            Err(TrySendError::Full(_)) => Ok(SendOutcome::Dropped),
            Err(TrySendError::Closed(_)) => {
                Err(CoreError::Transport("WebSocket 송신 루프 종료".to_string()))
            }
        }
    }

    fn close(&self) {
        // 송신자를 놓으면 송신 루프가 남은 프레임을 비운 뒤 Close 프레임을 보낸다
        self.tx.lock().take();
    }
}
