//! 라이프사이클 관리.
//!
//! 종료 신호 전파, OS 시그널 대기, 실행 시간 제한.

use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// 라이프사이클 관리자
pub struct LifecycleManager {
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl LifecycleManager {
    /// 새 라이프사이클 관리자 생성
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            shutdown_tx: tx,
            shutdown_rx: rx,
        }
    }

    /// 종료 수신기 복제
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// 종료 신호 발송
    pub fn shutdown(&self) {
        info!("종료 신호 발송");
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// OS 시그널(SIGINT, SIGTERM) 또는 제한 시간까지 대기 후 종료 신호 발송
    pub async fn wait_for_signal(&self, limit: Option<Duration>) {
        let deadline = async {
            match limit {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending().await,
            }
        };
        let mut shutdown_rx = self.subscribe();

        tokio::select! {
            _ = os_signal() => {}
            _ = deadline => {
                info!("실행 제한 시간 도달");
            }
            _ = shutdown_rx.wait_for(|stop| *stop) => {}
        }

        self.shutdown();
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

/// OS 종료 시그널 대기. 핸들러 등록 실패 시 시그널 없이 영원히 대기한다.
async fn os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut sigint, mut sigterm) =
            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
                (Err(e), _) | (_, Err(e)) => {
                    warn!("시그널 핸들러 등록 실패: {e}");
                    return std::future::pending().await;
                }
            };

        tokio::select! {
            _ = sigint.recv() => {
                info!("SIGINT 수신");
            }
            _ = sigterm.recv() => {
                info!("SIGTERM 수신");
            }
        }
    }

    #[cfg(not(unix))]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl+C 수신"),
            Err(e) => {
                warn!("Ctrl+C 핸들러 등록 실패: {e}");
                std::future::pending::<()>().await;
            }
        }
    }
}
