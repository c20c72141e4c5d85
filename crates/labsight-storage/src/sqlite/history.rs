//! 분석 히스토리와 인사이트 저장소 (InsightsStore 포트 구현).
//!
//! 히스토리 테이블은 추가 전용이며 원본은 `data` 컬럼에 JSON으로 보관한다.
//! 인사이트는 ID 기준으로 교체된다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use labsight_core::error::CoreError;
use labsight_core::models::anomaly::AnomalyFinding;
use labsight_core::models::capacity::CapacityPrediction;
use labsight_core::models::disk::DiskRiskAssessment;
use labsight_core::models::insight::Insight;
use labsight_core::ports::insights_store::InsightsStore;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::{dimension_column, query_err, to_ms, SqliteStorage};

/// `data` JSON 컬럼 하나를 반환하는 쿼리 실행 후 역직렬화
fn load_json<T: DeserializeOwned>(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<T>, CoreError> {
    let mut stmt = conn
        .prepare_cached(sql)
        .map_err(|e| CoreError::Storage(format!("쿼리 준비 실패: {e}")))?;

    let rows = stmt
        .query_map(params, |row| row.get::<_, String>(0))
        .map_err(query_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(query_err)?;

    rows.iter()
        .map(|data| serde_json::from_str(data).map_err(CoreError::from))
        .collect()
}

#[async_trait]
impl InsightsStore for SqliteStorage {
    // --------------------------------------------------------
    // 히스토리
    // --------------------------------------------------------

    async fn append_anomaly(&self, finding: &AnomalyFinding) -> Result<(), CoreError> {
        let data = serde_json::to_string(finding)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO anomaly_history (metric, dimension, severity, detected_at_ms, data)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                finding.metric,
                dimension_column(finding.dimension.as_deref()),
                finding.severity.as_str(),
                to_ms(finding.detected_at),
                data,
            ],
        )
        .map_err(|e| CoreError::Storage(format!("이상 히스토리 저장 실패: {e}")))?;
        Ok(())
    }

    async fn append_capacity_prediction(
        &self,
        prediction: &CapacityPrediction,
    ) -> Result<(), CoreError> {
        let data = serde_json::to_string(prediction)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO capacity_predictions (resource, generated_at_ms, days_until_full, data)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                prediction.resource,
                to_ms(prediction.generated_at),
                prediction.days_until_full,
                data,
            ],
        )
        .map_err(|e| CoreError::Storage(format!("용량 예측 저장 실패: {e}")))?;
        Ok(())
    }

    async fn append_disk_prediction(
        &self,
        assessment: &DiskRiskAssessment,
    ) -> Result<(), CoreError> {
        let data = serde_json::to_string(assessment)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO disk_predictions (disk_name, assessed_at_ms, failure_probability, data)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                assessment.disk_name,
                to_ms(assessment.assessed_at),
                assessment.failure_probability,
                data,
            ],
        )
        .map_err(|e| CoreError::Storage(format!("디스크 예측 저장 실패: {e}")))?;
        Ok(())
    }

    async fn anomaly_history(
        &self,
        metric: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<AnomalyFinding>, CoreError> {
        let conn = self.lock()?;
        match metric {
            Some(metric) => load_json(
                &conn,
                "SELECT data FROM anomaly_history
                 WHERE metric = ?1 AND detected_at_ms >= ?2
                 ORDER BY detected_at_ms ASC, id ASC",
                rusqlite::params![metric, to_ms(since)],
            ),
            None => load_json(
                &conn,
                "SELECT data FROM anomaly_history
                 WHERE detected_at_ms >= ?1
                 ORDER BY detected_at_ms ASC, id ASC",
                rusqlite::params![to_ms(since)],
            ),
        }
    }

    async fn capacity_history(
        &self,
        resource: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CapacityPrediction>, CoreError> {
        let conn = self.lock()?;
        load_json(
            &conn,
            "SELECT data FROM capacity_predictions
             WHERE resource = ?1 AND generated_at_ms >= ?2
             ORDER BY generated_at_ms ASC, id ASC",
            rusqlite::params![resource, to_ms(since)],
        )
    }

    async fn disk_prediction_history(
        &self,
        disk_name: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DiskRiskAssessment>, CoreError> {
        let conn = self.lock()?;
        load_json(
            &conn,
            "SELECT data FROM disk_predictions
             WHERE disk_name = ?1 AND assessed_at_ms >= ?2
             ORDER BY assessed_at_ms ASC, id ASC",
            rusqlite::params![disk_name, to_ms(since)],
        )
    }

    // --------------------------------------------------------
    // 인사이트
    // --------------------------------------------------------

    async fn upsert_insights(&self, insights: &[Insight]) -> Result<(), CoreError> {
        if insights.is_empty() {
            return Ok(());
        }

        let rows = insights
            .iter()
            .map(|insight| Ok((insight, serde_json::to_string(insight)?)))
            .collect::<Result<Vec<_>, CoreError>>()?;

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| CoreError::Storage(format!("트랜잭션 시작 실패: {e}")))?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO insights (id, insight_type, severity, generated_at_ms, expires_at_ms, data, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))
                     ON CONFLICT(id) DO UPDATE SET
                        insight_type = excluded.insight_type,
                        severity = excluded.severity,
                        generated_at_ms = excluded.generated_at_ms,
                        expires_at_ms = excluded.expires_at_ms,
                        data = excluded.data,
                        updated_at = excluded.updated_at",
                )
                .map_err(|e| CoreError::Storage(format!("쿼리 준비 실패: {e}")))?;

            for (insight, data) in &rows {
                stmt.execute(rusqlite::params![
                    insight.id,
                    insight.insight_type.as_str(),
                    insight.severity.as_str(),
                    to_ms(insight.generated_at),
                    insight.expires_at.map(to_ms),
                    data,
                ])
                .map_err(|e| CoreError::Storage(format!("인사이트 저장 실패: {e}")))?;
            }
        }
        tx.commit()
            .map_err(|e| CoreError::Storage(format!("트랜잭션 커밋 실패: {e}")))?;

        debug!(count = insights.len(), "인사이트 upsert 완료");
        Ok(())
    }

    async fn get_insight(&self, id: &str) -> Result<Option<Insight>, CoreError> {
        let conn = self.lock()?;
        let mut found: Vec<Insight> = load_json(
            &conn,
            "SELECT data FROM insights WHERE id = ?1",
            rusqlite::params![id],
        )?;
        Ok(found.pop())
    }

    async fn active_insights(&self, now: DateTime<Utc>) -> Result<Vec<Insight>, CoreError> {
        let conn = self.lock()?;
        let mut insights: Vec<Insight> = load_json(
            &conn,
            "SELECT data FROM insights
             WHERE expires_at_ms IS NULL OR expires_at_ms > ?1
             ORDER BY generated_at_ms DESC",
            rusqlite::params![to_ms(now)],
        )?;
        insights.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.insight_type.cmp(&b.insight_type))
                .then_with(|| a.title.cmp(&b.title))
        });
        Ok(insights)
    }

    async fn purge_expired_insights(&self, now: DateTime<Utc>) -> Result<usize, CoreError> {
        let conn = self.lock()?;
        let deleted = conn
            .execute(
                "DELETE FROM insights WHERE expires_at_ms IS NOT NULL AND expires_at_ms <= ?1",
                rusqlite::params![to_ms(now)],
            )
            .map_err(|e| CoreError::Storage(format!("만료 인사이트 삭제 실패: {e}")))?;

        if deleted > 0 {
            info!("만료 인사이트 {deleted}건 삭제");
        }
        Ok(deleted)
    }
}
