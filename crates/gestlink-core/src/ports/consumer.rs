//! 세션 이벤트 소비자 포트.
//!
//! 라이브 파이프라인과 데모 시뮬레이터 모두 같은 계약으로 소비자를 호출한다.
//! 콜백은 제어 타임라인 위에서 순차적으로 호출되므로 빠르게 반환해야 한다.

use crate::models::gesture::GestureEvent;
use crate::models::profile::GestureStats;
use crate::models::session::{Notice, SessionMetrics, TransportState};

/// 세션 이벤트 소비자 (통계 집계기, UI 등)
pub trait GestureConsumer: Send + Sync {
    /// 변경된 안정 제스처 이벤트
    fn on_gesture(&self, event: &GestureEvent);

    /// 1초 주기 메트릭 보고
    fn on_metrics(&self, _metrics: &SessionMetrics) {}

    /// 전송 연결 상태 변화
    fn on_connection(&self, _state: TransportState) {}

    /// 통계 폴링 결과 (실패 시 빈 통계)
    fn on_stats(&self, _stats: &GestureStats) {}

    /// 비차단 알림
    fn on_notice(&self, _notice: &Notice) {}
}
