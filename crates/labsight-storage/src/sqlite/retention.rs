//! 보존 기간 정리.
//!
//! 샘플과 히스토리 테이블에서 `retention_days`보다 오래된 행을 삭제한다.
//! 인사이트는 만료 시각 기준으로 따로 정리된다 (`purge_expired_insights`).

use chrono::{DateTime, Duration, Utc};
use labsight_core::error::CoreError;
use tracing::{debug, info};

use super::{to_ms, SqliteStorage};

/// (테이블, 시각 컬럼)
const RETAINED_TABLES: [(&str, &str); 5] = [
    ("metric_samples", "ts_ms"),
    ("smart_samples", "ts_ms"),
    ("anomaly_history", "detected_at_ms"),
    ("capacity_predictions", "generated_at_ms"),
    ("disk_predictions", "assessed_at_ms"),
];

impl SqliteStorage {
    /// 보존 기간 밖의 행 삭제, 삭제된 총 행 수 반환
    pub fn enforce_retention(&self, now: DateTime<Utc>) -> Result<usize, CoreError> {
        let cutoff = to_ms(now - Duration::days(i64::from(self.retention_days)));
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| CoreError::Storage(format!("트랜잭션 시작 실패: {e}")))?;

        let mut total = 0;
        for (table, column) in RETAINED_TABLES {
            let deleted = tx
                .execute(
                    &format!("DELETE FROM {table} WHERE {column} < ?1"),
                    rusqlite::params![cutoff],
                )
                .map_err(|e| CoreError::Storage(format!("{table} 정리 실패: {e}")))?;
            if deleted > 0 {
                debug!(table, deleted, "보존 기간 초과 행 삭제");
            }
            total += deleted;
        }

        tx.commit()
            .map_err(|e| CoreError::Storage(format!("트랜잭션 커밋 실패: {e}")))?;

        if total > 0 {
            info!("보존 정책 적용: {total}행 삭제 ({}일 초과)", self.retention_days);
        }
        Ok(total)
    }
}
