//! 메트릭 조회 포트 (읽기 전용).
//!
//! 구현: `labsight-storage` crate (rusqlite)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::models::disk::SmartSample;
use crate::models::metric::MetricSample;

/// 시계열 샘플 조회 — 분석 엔진은 이 포트를 통해서만 메트릭을 읽는다
#[async_trait]
pub trait MetricsReader: Send + Sync {
    /// `since` 이후 샘플을 타임스탬프 오름차순으로 조회 (비어 있을 수 있음)
    ///
    /// `dimension`이 `None`이면 차원 없는 샘플만 반환한다.
    async fn query(
        &self,
        metric: &str,
        dimension: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<MetricSample>, CoreError>;

    /// `since` 이후 샘플이 있는 차원 목록 (디스크/풀/컨테이너 이름)
    async fn dimensions(
        &self,
        metric: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<String>, CoreError>;

    /// 디스크 SMART 히스토리를 타임스탬프 오름차순으로 조회
    async fn smart_history(
        &self,
        disk_name: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<SmartSample>, CoreError>;

    /// `since` 이후 SMART 샘플이 있는 디스크 목록
    async fn disks(&self, since: DateTime<Utc>) -> Result<Vec<String>, CoreError>;
}
