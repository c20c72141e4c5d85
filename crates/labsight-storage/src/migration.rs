//! 스키마 마이그레이션.
//!
//! 버전 기반 SQLite 스키마 관리. 모든 시각 컬럼은 UTC 밀리초 정수(`*_ms`)로
//! 저장해 범위 조회가 문자열 비교에 의존하지 않게 한다.

use rusqlite::Connection;
use tracing::{debug, info};

/// 현재 스키마 버전
pub const CURRENT_VERSION: u32 = 3;

/// 스키마 마이그레이션 실행
pub fn run_migrations(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current = get_version(conn)?;
    info!("현재 스키마 버전: {current}, 목표: {CURRENT_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }

    if current < 2 {
        migrate_v2(conn)?;
    }

    if current < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

/// 현재 스키마 버전 조회
pub fn get_version(conn: &Connection) -> Result<u32, rusqlite::Error> {
    let result: Result<u32, _> = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    );
    result.or(Ok(0))
}

/// V1: 원시 샘플 테이블 (metric_samples + smart_samples)
fn migrate_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    debug!("마이그레이션 V1 실행: metric_samples + smart_samples 테이블");

    conn.execute_batch(
        "
        -- 시계열 샘플 (dimension 없음 = '')
        CREATE TABLE IF NOT EXISTS metric_samples (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            metric TEXT NOT NULL,
            dimension TEXT NOT NULL DEFAULT '',
            ts_ms INTEGER NOT NULL,
            value REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_samples_metric_dim_ts
            ON metric_samples(metric, dimension, ts_ms);
        CREATE INDEX IF NOT EXISTS idx_samples_ts ON metric_samples(ts_ms);

        -- SMART 카운터 스냅샷
        CREATE TABLE IF NOT EXISTS smart_samples (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            disk_name TEXT NOT NULL,
            ts_ms INTEGER NOT NULL,
            reallocated_sectors INTEGER NOT NULL DEFAULT 0,
            pending_sectors INTEGER NOT NULL DEFAULT 0,
            temperature_celsius REAL,
            power_on_hours INTEGER,
            health_passed INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_smart_disk_ts ON smart_samples(disk_name, ts_ms);

        INSERT INTO schema_version (version) VALUES (1);
        ",
    )?;

    info!("마이그레이션 V1 완료");
    Ok(())
}

/// V2: 분석 히스토리 테이블 (추가 전용)
fn migrate_v2(conn: &Connection) -> Result<(), rusqlite::Error> {
    debug!("마이그레이션 V2 실행: 분석 히스토리 테이블");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS anomaly_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            metric TEXT NOT NULL,
            dimension TEXT NOT NULL DEFAULT '',
            severity TEXT NOT NULL,
            detected_at_ms INTEGER NOT NULL,
            data TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_anomaly_metric_ts
            ON anomaly_history(metric, detected_at_ms);

        CREATE TABLE IF NOT EXISTS capacity_predictions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            resource TEXT NOT NULL,
            generated_at_ms INTEGER NOT NULL,
            days_until_full INTEGER,
            data TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_capacity_resource_ts
            ON capacity_predictions(resource, generated_at_ms);

        CREATE TABLE IF NOT EXISTS disk_predictions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            disk_name TEXT NOT NULL,
            assessed_at_ms INTEGER NOT NULL,
            failure_probability REAL NOT NULL,
            data TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_disk_pred_disk_ts
            ON disk_predictions(disk_name, assessed_at_ms);

        INSERT INTO schema_version (version) VALUES (2);
        ",
    )?;

    info!("마이그레이션 V2 완료");
    Ok(())
}

/// V3: 인사이트 테이블 (ID 기준 교체)
fn migrate_v3(conn: &Connection) -> Result<(), rusqlite::Error> {
    debug!("마이그레이션 V3 실행: insights 테이블");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS insights (
            id TEXT PRIMARY KEY,
            insight_type TEXT NOT NULL,
            severity TEXT NOT NULL,
            generated_at_ms INTEGER NOT NULL,
            expires_at_ms INTEGER,
            data TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_insights_expires ON insights(expires_at_ms);
        CREATE INDEX IF NOT EXISTS idx_insights_type ON insights(insight_type);

        INSERT INTO schema_version (version) VALUES (3);
        ",
    )?;

    info!("마이그레이션 V3 완료");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_reach_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, i64::from(CURRENT_VERSION));
    }

    #[test]
    fn all_tables_exist() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in [
            "metric_samples",
            "smart_samples",
            "anomaly_history",
            "capacity_predictions",
            "disk_predictions",
            "insights",
        ] {
            let exists: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(exists, 1, "{table} 테이블 없음");
        }
    }
}
