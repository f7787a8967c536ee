//! # gestlink-session
//!
//! 실시간 제스처 스트리밍 세션.
//! 주기 캡처, 전송 세션, 결과 디코딩을 하나의 제어 타임라인에서 조율하고
//! 변경된 제스처만 소비자에게 전달한다. 데모 시뮬레이터도 같은 계약을 따른다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! let controller = SessionRuntime::new(config, Arc::new(WsConnector::new()), camera)
//!     .with_api(api)
//!     .with_consumer(Arc::new(GestureTally::new()))
//!     .spawn();
//! controller.start().await?;
//! // ...
//! controller.stop().await?;
//! ```

pub mod consumers;
pub mod demo;
pub mod lifecycle;
pub mod metrics;
pub mod scheduler;
pub mod session;

pub use session::{SessionController, SessionRuntime, SessionSnapshot};
