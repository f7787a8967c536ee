//! 영속 계층(프로필/통계) API 클라이언트 포트.
//!
//! 구현: `gestlink-network` crate (reqwest)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::profile::{ApiHealth, GestureStats, Profile, ProfileCreate, ProfileUpdate};

/// 프로필 CRUD + 제스처 통계 조회
#[async_trait]
pub trait ProfileApi: Send + Sync {
    /// 전체 프로필 목록
    async fn list_profiles(&self) -> Result<Vec<Profile>, CoreError>;

    /// 단일 프로필 조회
    async fn get_profile(&self, id: &str) -> Result<Profile, CoreError>;

    /// 프로필 생성
    async fn create_profile(&self, request: &ProfileCreate) -> Result<Profile, CoreError>;

    /// 프로필 부분 수정
    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<Profile, CoreError>;

    /// 프로필 삭제
    async fn delete_profile(&self, id: &str) -> Result<(), CoreError>;

    /// 제스처 통계 (프로필 범위 선택)
    async fn gesture_stats(&self, profile_id: Option<&str>) -> Result<GestureStats, CoreError>;

    /// API 상태 확인
    async fn health(&self) -> Result<ApiHealth, CoreError>;
}
