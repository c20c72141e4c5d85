//! 메트릭/SMART 샘플 저장소 (MetricsReader 포트 구현).
//!
//! 기록 API는 수집기가 쓰고, 조회 API는 분석 엔진이 쓴다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use labsight_core::error::CoreError;
use labsight_core::models::disk::SmartSample;
use labsight_core::models::metric::{names, MetricSample};
use labsight_core::ports::metrics_reader::MetricsReader;
use tracing::debug;

use super::{dimension_column, from_ms, query_err, to_ms, SqliteStorage};

impl SqliteStorage {
    /// 샘플 하나 기록
    pub fn record_sample(
        &self,
        metric: &str,
        dimension: Option<&str>,
        timestamp: DateTime<Utc>,
        value: f64,
    ) -> Result<(), CoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO metric_samples (metric, dimension, ts_ms, value) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![metric, dimension_column(dimension), to_ms(timestamp), value],
        )
        .map_err(|e| CoreError::Storage(format!("샘플 저장 실패: {e}")))?;
        Ok(())
    }

    /// 같은 메트릭의 샘플 여러 개를 한 트랜잭션으로 기록
    pub fn record_samples(
        &self,
        metric: &str,
        dimension: Option<&str>,
        samples: &[MetricSample],
    ) -> Result<usize, CoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| CoreError::Storage(format!("트랜잭션 시작 실패: {e}")))?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO metric_samples (metric, dimension, ts_ms, value) VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(|e| CoreError::Storage(format!("쿼리 준비 실패: {e}")))?;
            for sample in samples {
                stmt.execute(rusqlite::params![
                    metric,
                    dimension_column(dimension),
                    to_ms(sample.timestamp),
                    sample.value
                ])
                .map_err(|e| CoreError::Storage(format!("샘플 저장 실패: {e}")))?;
            }
        }
        tx.commit()
            .map_err(|e| CoreError::Storage(format!("트랜잭션 커밋 실패: {e}")))?;

        debug!(metric, count = samples.len(), "샘플 배치 저장");
        Ok(samples.len())
    }

    /// SMART 스냅샷 기록
    ///
    /// 재할당/보류 섹터 수와 온도는 디스크 이름을 차원으로 `metric_samples`에도
    /// 같은 트랜잭션으로 기록된다. 이상 탐지와 추세 분석은 그 시계열을 읽는다.
    pub fn record_smart_sample(
        &self,
        disk_name: &str,
        sample: &SmartSample,
    ) -> Result<(), CoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| CoreError::Storage(format!("트랜잭션 시작 실패: {e}")))?;
        let ts_ms = to_ms(sample.timestamp);
        tx.execute(
            "INSERT INTO smart_samples
                (disk_name, ts_ms, reallocated_sectors, pending_sectors,
                 temperature_celsius, power_on_hours, health_passed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                disk_name,
                ts_ms,
                sample.reallocated_sectors as i64,
                sample.pending_sectors as i64,
                sample.temperature_celsius,
                sample.power_on_hours.map(|h| h as i64),
                sample.health_passed,
            ],
        )
        .map_err(|e| CoreError::Storage(format!("SMART 샘플 저장 실패: {e}")))?;

        let mirrored = [
            (
                names::SMART_REALLOCATED_SECTORS,
                Some(sample.reallocated_sectors as f64),
            ),
            (
                names::SMART_PENDING_SECTORS,
                Some(sample.pending_sectors as f64),
            ),
            (names::DISK_TEMPERATURE, sample.temperature_celsius),
        ];
        for (metric, value) in mirrored {
            let Some(value) = value else { continue };
            tx.execute(
                "INSERT INTO metric_samples (metric, dimension, ts_ms, value) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![metric, disk_name, ts_ms, value],
            )
            .map_err(|e| CoreError::Storage(format!("SMART 메트릭 저장 실패: {e}")))?;
        }

        tx.commit()
            .map_err(|e| CoreError::Storage(format!("트랜잭션 커밋 실패: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl MetricsReader for SqliteStorage {
    async fn query(
        &self,
        metric: &str,
        dimension: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<MetricSample>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare_cached(
                "SELECT ts_ms, value FROM metric_samples
                 WHERE metric = ?1 AND dimension = ?2 AND ts_ms >= ?3
                 ORDER BY ts_ms ASC, id ASC",
            )
            .map_err(|e| CoreError::Storage(format!("쿼리 준비 실패: {e}")))?;

        let samples = stmt
            .query_map(
                rusqlite::params![metric, dimension_column(dimension), to_ms(since)],
                |row| Ok(MetricSample::new(from_ms(row.get(0)?), row.get(1)?)),
            )
            .map_err(query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err)?;

        Ok(samples)
    }

    async fn dimensions(
        &self,
        metric: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<String>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare_cached(
                "SELECT DISTINCT dimension FROM metric_samples
                 WHERE metric = ?1 AND dimension != '' AND ts_ms >= ?2
                 ORDER BY dimension",
            )
            .map_err(|e| CoreError::Storage(format!("쿼리 준비 실패: {e}")))?;

        let dims = stmt
            .query_map(rusqlite::params![metric, to_ms(since)], |row| row.get(0))
            .map_err(query_err)?
            .collect::<Result<Vec<String>, _>>()
            .map_err(query_err)?;

        Ok(dims)
    }

    async fn smart_history(
        &self,
        disk_name: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<SmartSample>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare_cached(
                "SELECT ts_ms, reallocated_sectors, pending_sectors, temperature_celsius, power_on_hours, health_passed
                 FROM smart_samples
                 WHERE disk_name = ?1 AND ts_ms >= ?2
                 ORDER BY ts_ms ASC, id ASC",
            )
            .map_err(|e| CoreError::Storage(format!("쿼리 준비 실패: {e}")))?;

        let samples = stmt
            .query_map(rusqlite::params![disk_name, to_ms(since)], |row| {
                Ok(SmartSample {
                    timestamp: from_ms(row.get(0)?),
                    reallocated_sectors: row.get::<_, i64>(1)?.max(0) as u64,
                    pending_sectors: row.get::<_, i64>(2)?.max(0) as u64,
                    temperature_celsius: row.get(3)?,
                    power_on_hours: row.get::<_, Option<i64>>(4)?.map(|h| h.max(0) as u64),
                    health_passed: row.get(5)?,
                })
            })
            .map_err(query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err)?;

        Ok(samples)
    }

    async fn disks(&self, since: DateTime<Utc>) -> Result<Vec<String>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare_cached(
                "SELECT DISTINCT disk_name FROM smart_samples WHERE ts_ms >= ?1 ORDER BY disk_name",
            )
            .map_err(|e| CoreError::Storage(format!("쿼리 준비 실패: {e}")))?;

        let disks = stmt
            .query_map(rusqlite::params![to_ms(since)], |row| row.get(0))
            .map_err(query_err)?
            .collect::<Result<Vec<String>, _>>()
            .map_err(query_err)?;

        Ok(disks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn query_is_ordered_and_windowed() {
        let storage = SqliteStorage::open_in_memory(30).unwrap();
        let now = Utc::now();

        storage
            .record_sample("cpu_percent", None, now - Duration::hours(1), 30.0)
            .unwrap();
        storage
            .record_sample("cpu_percent", None, now - Duration::hours(3), 10.0)
            .unwrap();
        storage
            .record_sample("cpu_percent", None, now - Duration::hours(48), 99.0)
            .unwrap();
        storage
            .record_sample("cpu_percent", Some("node-2"), now, 77.0)
            .unwrap();

        let samples = storage
            .query("cpu_percent", None, now - Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].value, 10.0);
        assert_eq!(samples[1].value, 30.0);

        let node = storage
            .query("cpu_percent", Some("node-2"), now - Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(node.len(), 1);

        let none = storage
            .query("memory_percent", None, now - Duration::hours(24))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn dimensions_exclude_undimensioned_rows() {
        let storage = SqliteStorage::open_in_memory(30).unwrap();
        let now = Utc::now();
        let samples: Vec<MetricSample> = (0..3)
            .map(|i| MetricSample::new(now - Duration::minutes(i), 1.0))
            .collect();

        storage.record_samples("pool_fill_percent", Some("tank"), &samples).unwrap();
        storage.record_samples("pool_fill_percent", Some("backup"), &samples).unwrap();
        storage.record_samples("pool_fill_percent", None, &samples).unwrap();

        let dims = storage
            .dimensions("pool_fill_percent", now - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(dims, vec!["backup".to_string(), "tank".to_string()]);
    }

    #[tokio::test]
    async fn smart_history_roundtrip() {
        let storage = SqliteStorage::open_in_memory(30).unwrap();
        let now = Utc::now();

        let mut sample = SmartSample::healthy(now - Duration::days(1));
        sample.reallocated_sectors = 8;
        sample.temperature_celsius = Some(41.5);
        sample.power_on_hours = Some(30_000);
        storage.record_smart_sample("sda", &sample).unwrap();
        storage
            .record_smart_sample("sdb", &SmartSample::healthy(now))
            .unwrap();
        storage
            .record_smart_sample("sdc", &SmartSample::healthy(now - Duration::days(90)))
            .unwrap();

        let history = storage
            .smart_history("sda", now - Duration::days(30))
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reallocated_sectors, 8);
        assert_eq!(history[0].temperature_celsius, Some(41.5));
        assert_eq!(history[0].power_on_hours, Some(30_000));
        assert_eq!(history[0].health_passed, Some(true));

        let disks = storage.disks(now - Duration::days(30)).await.unwrap();
        assert_eq!(disks, vec!["sda".to_string(), "sdb".to_string()]);
    }

    #[tokio::test]
    async fn smart_counters_are_mirrored_as_metrics() {
        let storage = SqliteStorage::open_in_memory(30).unwrap();
        let now = Utc::now();

        let mut sample = SmartSample::healthy(now);
        sample.reallocated_sectors = 12;
        sample.pending_sectors = 3;
        sample.temperature_celsius = Some(44.0);
        storage.record_smart_sample("sda", &sample).unwrap();
        storage
            .record_smart_sample("sdb", &SmartSample::healthy(now))
            .unwrap();

        let since = now - Duration::hours(1);
        let reallocated = storage
            .query(names::SMART_REALLOCATED_SECTORS, Some("sda"), since)
            .await
            .unwrap();
        assert_eq!(reallocated.len(), 1);
        assert_eq!(reallocated[0].value, 12.0);

        let pending = storage
            .query(names::SMART_PENDING_SECTORS, Some("sda"), since)
            .await
            .unwrap();
        assert_eq!(pending[0].value, 3.0);

        let temperature = storage
            .query(names::DISK_TEMPERATURE, Some("sda"), since)
            .await
            .unwrap();
        assert_eq!(temperature[0].value, 44.0);

        let dims = storage
            .dimensions(names::SMART_PENDING_SECTORS, since)
            .await
            .unwrap();
        assert_eq!(dims, vec!["sda".to_string(), "sdb".to_string()]);
    }
}
