//! 인사이트 영속화 포트.
//!
//! 구현: `labsight-storage` crate (rusqlite)
//!
//! 원시 발견 사항은 추가 전용(append-only) 히스토리로, 인사이트는
//! ID 기준 교체(insert or replace)로 저장된다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::models::anomaly::AnomalyFinding;
use crate::models::capacity::CapacityPrediction;
use crate::models::disk::DiskRiskAssessment;
use crate::models::insight::Insight;

/// 분석 결과 저장소
#[async_trait]
pub trait InsightsStore: Send + Sync {
    // ============================================================
    // 히스토리 (추가 전용)
    // ============================================================

    /// 이상 탐지 결과 추가
    async fn append_anomaly(&self, finding: &AnomalyFinding) -> Result<(), CoreError>;

    /// 용량 예측 추가
    async fn append_capacity_prediction(
        &self,
        prediction: &CapacityPrediction,
    ) -> Result<(), CoreError>;

    /// 디스크 위험 평가 추가 (덮어쓰지 않음)
    async fn append_disk_prediction(
        &self,
        assessment: &DiskRiskAssessment,
    ) -> Result<(), CoreError>;

    /// `since` 이후 이상 탐지 히스토리 (오래된 순)
    async fn anomaly_history(
        &self,
        metric: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<AnomalyFinding>, CoreError>;

    /// `since` 이후 용량 예측 히스토리 (오래된 순)
    async fn capacity_history(
        &self,
        resource: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CapacityPrediction>, CoreError>;

    /// `since` 이후 디스크 위험 평가 히스토리 (오래된 순)
    async fn disk_prediction_history(
        &self,
        disk_name: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DiskRiskAssessment>, CoreError>;

    // ============================================================
    // 인사이트 (ID 기준 교체)
    // ============================================================

    /// 인사이트 저장 — 같은 ID가 있으면 교체
    async fn upsert_insights(&self, insights: &[Insight]) -> Result<(), CoreError>;

    /// ID로 인사이트 조회
    async fn get_insight(&self, id: &str) -> Result<Option<Insight>, CoreError>;

    /// `now` 기준 만료되지 않은 인사이트 (심각도 내림차순)
    async fn active_insights(&self, now: DateTime<Utc>) -> Result<Vec<Insight>, CoreError>;

    /// 만료된 인사이트 삭제, 삭제된 행 수 반환
    async fn purge_expired_insights(&self, now: DateTime<Utc>) -> Result<usize, CoreError>;
}
