//! HTTP REST API 클라이언트.
//!
//! `ProfileApi` 포트 구현. 프로필 CRUD, 제스처 통계, 상태 확인.
//! 재시도하지 않는다. 실패는 호출자(통계 폴러 등)가 다음 주기에 다시 시도한다.

use async_trait::async_trait;
use gestlink_core::error::CoreError;
use gestlink_core::models::profile::{
    ApiHealth, GestureStats, Profile, ProfileCreate, ProfileUpdate,
};
use gestlink_core::ports::api_client::ProfileApi;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const PROFILES_PATH: &str = "/api/profiles";
const STATS_PATH: &str = "/api/gestures/stats";
const HEALTH_PATH: &str = "/api/";

/// REST API 클라이언트 — `ProfileApi` 포트 구현
pub struct HttpProfileClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProfileClient {
    /// 새 HTTP 클라이언트 생성
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/api/profiles/{id}` (id는 경로 세그먼트로 인코딩)
    fn profile_url(&self, id: &str) -> Result<Url, CoreError> {
        let mut url = Url::parse(&self.url(PROFILES_PATH))
            .map_err(|e| CoreError::Config(format!("프로필 URL 구성 실패: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| CoreError::Config(format!("경로를 붙일 수 없는 URL: {}", self.base_url)))?
            .push(id);
        Ok(url)
    }

    /// 응답 상태 코드 확인 및 에러 매핑
    async fn check_response(
        resp: reqwest::Response,
        resource_id: Option<&str>,
    ) -> Result<reqwest::Response, CoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let text = resp.text().await.unwrap_or_else(|e| {
            warn!("응답 본문 읽기 실패: {e}");
            String::new()
        });

        match status.as_u16() {
            404 => Err(CoreError::NotFound {
                resource_type: "Profile".to_string(),
                id: resource_id.map(str::to_string).unwrap_or(text),
            }),
            422 => Err(CoreError::Validation {
                field: "request".to_string(),
                message: text,
            }),
            503 => Err(CoreError::ServiceUnavailable(text)),
            _ => Err(CoreError::Internal(format!("API 에러 ({status}): {text}"))),
        }
    }

    /// 요청 실행 → 상태 확인 → JSON 역직렬화
    async fn fetch<T: DeserializeOwned>(
        request: reqwest::RequestBuilder,
        resource_id: Option<&str>,
    ) -> Result<T, CoreError> {
        let resp = request
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("요청 실패: {e}")))?;
        let resp = Self::check_response(resp, resource_id).await?;
        resp.json::<T>()
            .await
            .map_err(|e| CoreError::Internal(format!("응답 파싱 실패: {e}")))
    }
}

#[async_trait]
impl ProfileApi for HttpProfileClient {
    async fn list_profiles(&self) -> Result<Vec<Profile>, CoreError> {
        let profiles: Vec<Profile> =
            Self::fetch(self.client.get(self.url(PROFILES_PATH)), None).await?;
        debug!("프로필 목록: {}개", profiles.len());
        Ok(profiles)
    }

    async fn get_profile(&self, id: &str) -> Result<Profile, CoreError> {
        Self::fetch(self.client.get(self.profile_url(id)?), Some(id)).await
    }

    async fn create_profile(&self, request: &ProfileCreate) -> Result<Profile, CoreError> {
        if request.name.trim().is_empty() {
            return Err(CoreError::Validation {
                field: "name".to_string(),
                message: "프로필 이름이 비어 있음".to_string(),
            });
        }
        if let Some(settings) = &request.gesture_settings {
            settings.validate()?;
        }
        let profile: Profile =
            Self::fetch(self.client.post(self.url(PROFILES_PATH)).json(request), None).await?;
        debug!("프로필 생성: {} ({})", profile.name, profile.id);
        Ok(profile)
    }

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<Profile, CoreError> {
        if let Some(settings) = &update.gesture_settings {
            settings.validate()?;
        }
        Self::fetch(self.client.put(self.profile_url(id)?).json(update), Some(id)).await
    }

    async fn delete_profile(&self, id: &str) -> Result<(), CoreError> {
        let resp = self
            .client
            .delete(self.profile_url(id)?)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("요청 실패: {e}")))?;
        Self::check_response(resp, Some(id)).await?;
        debug!("프로필 삭제: {id}");
        Ok(())
    }

    async fn gesture_stats(&self, profile_id: Option<&str>) -> Result<GestureStats, CoreError> {
        let mut url = Url::parse(&self.url(STATS_PATH))
            .map_err(|e| CoreError::Config(format!("통계 URL 구성 실패: {e}")))?;
        if let Some(id) = profile_id.filter(|id| !id.is_empty()) {
            url.query_pairs_mut().append_pair("profile_id", id);
        }
        Self::fetch(self.client.get(url), None).await
    }

    async fn health(&self) -> Result<ApiHealth, CoreError> {
        Self::fetch(self.client.get(self.url(HEALTH_PATH)), None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gestlink_core::models::gesture::{ActionKind, GestureKind};
    use gestlink_core::models::profile::{ActionMapping, GestureSettings};
    use mockito::Matcher;

    const PROFILE_JSON: &str = r#"{"id":"abc123","name":"Default","description":"test","is_active":true,"created_at":"2025-01-15T10:30:00+00:00"}"#;

    fn client(server: &mockito::ServerGuard) -> HttpProfileClient {
        HttpProfileClient::new(&server.url(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn list_profiles_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/profiles")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!("[{PROFILE_JSON}]"))
            .create_async()
            .await;

        let profiles = client(&server).list_profiles().await.unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].id, "abc123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_profile_posts_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/profiles")
            .match_body(Matcher::Json(serde_json::json!({"name": "Default"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(PROFILE_JSON)
            .create_async()
            .await;

        let request = ProfileCreate::new("Default");
        let profile = client(&server).create_profile(&request).await.unwrap();
        assert_eq!(profile.name, "Default");
        assert!(profile.is_active);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_profile_rejects_blank_name() {
        let server = mockito::Server::new_async().await;
        let request = ProfileCreate::new("  ");
        let result = client(&server).create_profile(&request).await;
        assert!(matches!(result, Err(CoreError::Validation { .. })));
    }

    #[tokio::test]
    async fn get_missing_profile_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/profiles/nope")
            .with_status(404)
            .with_body(r#"{"detail":"not found"}"#)
            .create_async()
            .await;

        let result = client(&server).get_profile("nope").await;
        match result {
            Err(CoreError::NotFound { id, .. }) => assert_eq!(id, "nope"),
            other => panic!("NotFound 기대, 실제: {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_profile_puts_partial_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/profiles/abc123")
            .match_body(Matcher::Json(serde_json::json!({"is_active": false})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(PROFILE_JSON.replace("\"is_active\":true", "\"is_active\":false"))
            .create_async()
            .await;

        let update = ProfileUpdate {
            is_active: Some(false),
            ..Default::default()
        };
        let profile = client(&server).update_profile("abc123", &update).await.unwrap();
        assert!(!profile.is_active);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_profile_with_settings_and_mapping() {
        let mut server = mockito::Server::new_async().await;
        let mut settings = GestureSettings::default();
        settings.set_threshold(GestureKind::Fist, 0.6).unwrap();
        let mut mapping = ActionMapping::default();
        mapping.remap(GestureKind::Fist, ActionKind::RightClick).unwrap();

        let body = serde_json::json!({
            "name": "왼손",
            "gesture_settings": settings,
            "action_mapping": mapping,
        });
        let mut reply = body.clone();
        reply["id"] = "p1".into();
        reply["created_at"] = "2026-01-05T10:00:00+00:00".into();
        reply["updated_at"] = "2026-01-05T10:00:00+00:00".into();

        let mock = server
            .mock("POST", "/api/profiles")
            .match_body(Matcher::Json(body))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(reply.to_string())
            .create_async()
            .await;

        let request = ProfileCreate {
            gesture_settings: Some(settings.clone()),
            action_mapping: Some(mapping),
            ..ProfileCreate::new("왼손")
        };
        let profile = client(&server).create_profile(&request).await.unwrap();
        assert_eq!(profile.gesture_settings, settings);
        assert_eq!(profile.action_mapping.action_for(GestureKind::Fist), ActionKind::RightClick);
        assert!(profile.updated_at.is_some());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn update_profile_sends_settings_and_reads_them_back() {
        let mut server = mockito::Server::new_async().await;
        let settings = GestureSettings {
            smoothing_factor: 0.2,
            ..Default::default()
        };
        let reply = serde_json::json!({
            "id": "abc123",
            "name": "Default",
            "gesture_settings": {"smoothing_factor": 0.2, "pinch_threshold": 0.5},
            "action_mapping": {"open_hand": "none"},
            "is_active": true,
            "created_at": "2025-01-15T10:30:00+00:00",
            "updated_at": "2026-02-01T08:00:00+00:00"
        });
        let mock = server
            .mock("PUT", "/api/profiles/abc123")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "gesture_settings": {"smoothing_factor": 0.2, "fist_threshold": 0.8}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(reply.to_string())
            .create_async()
            .await;

        let update = ProfileUpdate {
            gesture_settings: Some(settings),
            ..Default::default()
        };
        let profile = client(&server).update_profile("abc123", &update).await.unwrap();
        assert_eq!(profile.gesture_settings.threshold(GestureKind::Pinch), Some(0.5));
        assert_eq!(profile.gesture_settings.smoothing_factor, 0.2);
        assert_eq!(profile.action_mapping.action_for(GestureKind::OpenHand), ActionKind::None);
        assert_eq!(profile.action_mapping.action_for(GestureKind::Fist), ActionKind::LeftClick);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn out_of_range_settings_rejected_before_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let update = ProfileUpdate {
            gesture_settings: Some(GestureSettings {
                scroll_sensitivity: 5.0,
                ..Default::default()
            }),
            ..Default::default()
        };
        let result = client(&server).update_profile("abc123", &update).await;
        assert!(matches!(result, Err(CoreError::Validation { .. })));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn profile_id_is_percent_encoded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex(r"^/api/profiles/a%2[Ff]b%20c$".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(PROFILE_JSON)
            .create_async()
            .await;

        let profile = client(&server).get_profile("a/b c").await.unwrap();
        assert_eq!(profile.id, "abc123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_profile_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/profiles/abc123")
            .with_status(200)
            .with_body(r#"{"message":"deleted"}"#)
            .create_async()
            .await;

        assert!(client(&server).delete_profile("abc123").await.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn stats_scoped_by_profile() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/gestures/stats")
            .match_query(Matcher::UrlEncoded("profile_id".into(), "abc123".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"total_gestures":3,"gesture_counts":{"fist":2,"pinch":1},"recent_logs":[]}"#)
            .create_async()
            .await;

        let stats = client(&server).gesture_stats(Some("abc123")).await.unwrap();
        assert_eq!(stats.total_gestures, 3);
        assert_eq!(stats.sorted_counts()[0], ("fist", 2));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn stats_service_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/gestures/stats")
            .with_status(503)
            .with_body("Service Unavailable")
            .create_async()
            .await;

        let result = client(&server).gesture_stats(None).await;
        assert!(matches!(result, Err(CoreError::ServiceUnavailable(_))));
    }

    #[tokio::test]
    async fn health_check() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"Gesture API","version":"1.0.0","status":"running"}"#)
            .create_async()
            .await;

        let health = client(&server).health().await.unwrap();
        assert_eq!(health.status, "running");
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        // 바인딩 후 닫아서 사용되지 않는 포트 확보
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpProfileClient::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();
        let result = client.list_profiles().await;
        assert!(matches!(result, Err(CoreError::Network(_))));
    }
}
