//! 양방향 전송 포트.
//!
//! 구현: `gestlink-network` crate (`WsConnector`, `LoopbackConnector`)

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::CoreError;

/// 전송 계층에서 수신한 원시 메시지
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// 텍스트 메시지 (JSON)
    Text(String),
    /// 바이너리 메시지
    Binary(Vec<u8>),
    /// 원격 측 연결 종료
    Closed,
    /// 수신 중 전송 에러
    Error(String),
}

/// 송신 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// 송신 큐에 들어감
    Sent,
    /// 이전 프레임이 아직 나가지 않아 폐기됨 (큐잉하지 않음)
    Dropped,
}

/// 송신 핸들. 응답 확인 없는 fire-and-forget 전송.
pub trait TransportSink: Send + Sync {
    /// 텍스트 메시지 송신 시도. 대기하지 않는다.
    fn try_send(&self, text: String) -> Result<SendOutcome, CoreError>;

    /// 연결 종료 요청
    fn close(&self);
}

/// 수립된 연결: 송신 핸들 + 수신 채널
pub struct TransportLink {
    pub sink: Box<dyn TransportSink>,
    pub inbound: mpsc::Receiver<InboundMessage>,
}

impl std::fmt::Debug for TransportLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportLink").finish_non_exhaustive()
    }
}

/// 연결 수립기
#[async_trait]
pub trait TransportConnector: Send + Sync {
    /// `url`로 연결을 수립한다.
    async fn connect(&self, url: &str) -> Result<TransportLink, CoreError>;
}
