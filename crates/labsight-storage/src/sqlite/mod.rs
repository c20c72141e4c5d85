//! SQLite 저장소 어댑터.
//!
//! `MetricsReader` + `InsightsStore` 포트 구현.
//!
//! # 모듈 구조
//! - `samples`: 메트릭/SMART 샘플 기록과 조회 (MetricsReader 포트)
//! - `history`: 분석 히스토리와 인사이트 (InsightsStore 포트)
//! - `retention`: 보존 기간이 지난 행 정리

mod history;
mod retention;
mod samples;

use chrono::{DateTime, Utc};
use labsight_core::error::CoreError;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::migration;

/// SQLite 저장소 — `MetricsReader` + `InsightsStore` 포트 구현
///
/// 연결 하나를 뮤텍스로 공유한다. 모든 조회는 시간 윈도우로 범위를 좁혀
/// 다른 프로세스의 동시 쓰기(WAL)와 공존한다.
pub struct SqliteStorage {
    pub(super) conn: Mutex<Connection>,
    pub(super) retention_days: u32,
}

impl SqliteStorage {
    /// 파일 기반 SQLite 저장소 생성
    pub fn open(path: &Path, retention_days: u32) -> Result<Self, CoreError> {
        let conn = Connection::open(path)
            .map_err(|e| CoreError::Storage(format!("SQLite 열기 실패: {e}")))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA busy_timeout=5000;
            PRAGMA cache_size=8000;
            PRAGMA temp_store=MEMORY;
            ",
        )
        .map_err(|e| CoreError::Storage(format!("PRAGMA 설정 실패: {e}")))?;

        migration::run_migrations(&conn)
            .map_err(|e| CoreError::Storage(format!("마이그레이션 실패: {e}")))?;

        info!("SQLite 저장소 초기화: {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
            retention_days,
        })
    }

    /// 인메모리 SQLite 저장소 생성 (테스트용)
    pub fn open_in_memory(retention_days: u32) -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CoreError::Storage(format!("인메모리 SQLite 생성 실패: {e}")))?;

        migration::run_migrations(&conn)
            .map_err(|e| CoreError::Storage(format!("마이그레이션 실패: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
            retention_days,
        })
    }

    /// 보존 기간 (일)
    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    pub(super) fn lock(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn
            .lock()
            .map_err(|e| CoreError::Storage(format!("잠금 획득 실패: {e}")))
    }
}

/// UTC 시각 → 밀리초
pub(super) fn to_ms(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// 밀리초 → UTC 시각 (범위 밖이면 epoch)
pub(super) fn from_ms(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default()
}

/// 선택적 차원 → 컬럼 값 (없음 = '')
pub(super) fn dimension_column(dimension: Option<&str>) -> &str {
    dimension.unwrap_or("")
}

pub(super) fn query_err(e: rusqlite::Error) -> CoreError {
    CoreError::Storage(format!("쿼리 실행 실패: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_file_database_twice() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("labsight.db");

        {
            let storage = SqliteStorage::open(&path, 30).unwrap();
            storage
                .record_sample("cpu_percent", None, Utc::now(), 12.5)
                .unwrap();
        }

        // 재오픈 시 마이그레이션은 건너뛰고 데이터는 유지
        let storage = SqliteStorage::open(&path, 30).unwrap();
        assert_eq!(storage.retention_days(), 30);
        let count: i64 = storage
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM metric_samples", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn millisecond_roundtrip() {
        let now = Utc::now();
        let back = from_ms(to_ms(now));
        assert_eq!(back.timestamp_millis(), now.timestamp_millis());
        assert_eq!(dimension_column(None), "");
        assert_eq!(dimension_column(Some("tank")), "tank");
    }
}
