//! 세션 통합 테스트 공용 도구.

#![allow(dead_code)]

use async_trait::async_trait;
use gestlink_core::config::AppConfig;
use gestlink_core::error::CoreError;
use gestlink_core::models::gesture::GestureEvent;
use gestlink_core::models::profile::{
    ApiHealth, GestureStats, Profile, ProfileCreate, ProfileUpdate,
};
use gestlink_core::models::session::{Notice, SessionMetrics, TransportState};
use gestlink_core::ports::api_client::ProfileApi;
use gestlink_core::ports::camera::CameraSource;
use gestlink_core::ports::consumer::GestureConsumer;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// 모든 콜백을 기록하는 소비자
#[derive(Default)]
pub struct Recorder {
    pub events: Mutex<Vec<GestureEvent>>,
    pub metrics: Mutex<Vec<SessionMetrics>>,
    pub connections: Mutex<Vec<TransportState>>,
    pub stats: Mutex<Vec<GestureStats>>,
    pub notices: Mutex<Vec<Notice>>,
}

impl Recorder {
    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }

    pub fn metrics_count(&self) -> usize {
        self.metrics.lock().len()
    }

    pub fn last_metrics(&self) -> Option<SessionMetrics> {
        self.metrics.lock().last().copied()
    }

    pub fn connections(&self) -> Vec<TransportState> {
        self.connections.lock().clone()
    }

    pub fn notice_messages(&self) -> Vec<String> {
        self.notices.lock().iter().map(|n| n.message.clone()).collect()
    }
}

impl GestureConsumer for Recorder {
    fn on_gesture(&self, event: &GestureEvent) {
        self.events.lock().push(event.clone());
    }

    fn on_metrics(&self, metrics: &SessionMetrics) {
        self.metrics.lock().push(*metrics);
    }

    fn on_connection(&self, state: TransportState) {
        self.connections.lock().push(state);
    }

    fn on_stats(&self, stats: &GestureStats) {
        self.stats.lock().push(stats.clone());
    }

    fn on_notice(&self, notice: &Notice) {
        self.notices.lock().push(notice.clone());
    }
}

/// 매 틱 같은 JPEG 바이트를 돌려주는 카메라
pub struct StaticCamera;

impl CameraSource for StaticCamera {
    fn current_frame(&mut self) -> Option<Vec<u8>> {
        Some(vec![0xFF, 0xD8, 0xFF, 0xE0])
    }
}

/// 고정 통계 또는 실패를 돌려주는 API
pub struct StatsApi {
    pub fail: bool,
    pub calls: AtomicUsize,
    pub scopes: Mutex<Vec<Option<String>>>,
}

impl StatsApi {
    pub fn ok() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
            scopes: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileApi for StatsApi {
    async fn list_profiles(&self) -> Result<Vec<Profile>, CoreError> {
        Ok(Vec::new())
    }

    async fn get_profile(&self, id: &str) -> Result<Profile, CoreError> {
        Err(CoreError::NotFound {
            resource_type: "Profile".to_string(),
            id: id.to_string(),
        })
    }

    async fn create_profile(&self, _request: &ProfileCreate) -> Result<Profile, CoreError> {
        Err(CoreError::Internal("지원하지 않음".to_string()))
    }

    async fn update_profile(&self, id: &str, _update: &ProfileUpdate) -> Result<Profile, CoreError> {
        self.get_profile(id).await
    }

    async fn delete_profile(&self, _id: &str) -> Result<(), CoreError> {
        Ok(())
    }

    async fn gesture_stats(&self, profile_id: Option<&str>) -> Result<GestureStats, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.scopes.lock().push(profile_id.map(str::to_string));
        if self.fail {
            return Err(CoreError::ServiceUnavailable("stats down".to_string()));
        }
        Ok(GestureStats {
            total_gestures: 3,
            gesture_counts: BTreeMap::from([("fist".to_string(), 2), ("pinch".to_string(), 1)]),
            recent_logs: Vec::new(),
        })
    }

    async fn health(&self) -> Result<ApiHealth, CoreError> {
        Ok(ApiHealth {
            message: "ok".to_string(),
            version: "1.0.0".to_string(),
            status: "running".to_string(),
        })
    }
}

/// 통계 폴링을 끈 테스트 설정
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default_config();
    config.stats.enabled = false;
    config
}

/// 액터와 연결 태스크가 처리할 시간을 준다 (일시정지 시계에서 즉시 진행)
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

pub fn fist(changed: bool) -> String {
    format!(
        r#"{{"gesture":"fist","action":"left_click","confidence":0.88,"stable":true,"gesture_changed":{changed}}}"#
    )
}
