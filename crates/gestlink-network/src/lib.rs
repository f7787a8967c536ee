//! # gestlink-network
//!
//! 백엔드와의 통신 어댑터.
//! 제스처 WebSocket 전송 세션(상태 머신), 수신 결과 디코더,
//! 프로필/통계 REST 클라이언트를 제공한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use gestlink_network::transport::TransportSession;
//! use gestlink_network::ws_client::WsConnector;
//!
//! let mut transport = TransportSession::new(Arc::new(WsConnector::new()), "http://localhost:8000");
//! transport.open(Some("abc123".to_string()))?;
//! ```

pub mod decoder;
pub mod http_client;
pub mod loopback;
pub mod transport;
pub mod ws_client;
