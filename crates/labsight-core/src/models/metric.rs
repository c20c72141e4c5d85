//! 시계열 샘플 모델.
//!
//! `MetricsReader`가 반환하는 불변 샘플과 표준 메트릭 이름.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 단일 시계열 샘플 (불변)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// 수집 시각
    pub timestamp: DateTime<Utc>,
    /// 측정값
    pub value: f64,
}

impl MetricSample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// 샘플 목록에서 값만 추출
pub fn values(samples: &[MetricSample]) -> Vec<f64> {
    samples.iter().map(|s| s.value).collect()
}

/// 메트릭 키 표기 — `metric` 또는 `metric[dimension]`
pub fn subject_key(metric: &str, dimension: Option<&str>) -> String {
    match dimension {
        Some(dim) if !dim.is_empty() => format!("{metric}[{dim}]"),
        _ => metric.to_string(),
    }
}

/// 수집기가 기록하는 표준 메트릭 이름
pub mod names {
    /// 호스트 CPU 사용률 (%)
    pub const CPU_PERCENT: &str = "cpu_percent";
    /// 호스트 메모리 사용률 (%)
    pub const MEMORY_PERCENT: &str = "memory_percent";
    /// 스토리지 풀 사용률 (%) — dimension: 풀 이름
    pub const POOL_FILL_PERCENT: &str = "pool_fill_percent";
    /// SMART 재할당 섹터 수 — dimension: 디스크 이름
    pub const SMART_REALLOCATED_SECTORS: &str = "smart_reallocated_sectors";
    /// SMART 보류 섹터 수 — dimension: 디스크 이름
    pub const SMART_PENDING_SECTORS: &str = "smart_pending_sectors";
    /// 디스크 온도 (°C) — dimension: 디스크 이름
    pub const DISK_TEMPERATURE: &str = "disk_temperature_celsius";
    /// 컨테이너 CPU 사용률 (%) — dimension: 컨테이너 이름
    pub const CONTAINER_CPU_PERCENT: &str = "container_cpu_percent";
    /// 스냅샷 개수
    pub const SNAPSHOT_COUNT: &str = "snapshot_count";
    /// 스토리지 사용량 (바이트) — dimension: 풀 이름
    pub const STORAGE_USED_BYTES: &str = "storage_used_bytes";
    /// 스토리지 전체 용량 (바이트) — dimension: 풀 이름
    pub const STORAGE_CAPACITY_BYTES: &str = "storage_capacity_bytes";
    /// 메모리 사용량 (바이트)
    pub const MEMORY_USED_BYTES: &str = "memory_used_bytes";
    /// 전체 메모리 (바이트)
    pub const MEMORY_TOTAL_BYTES: &str = "memory_total_bytes";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_key_with_dimension() {
        assert_eq!(subject_key(names::CPU_PERCENT, None), "cpu_percent");
        assert_eq!(
            subject_key(names::POOL_FILL_PERCENT, Some("tank")),
            "pool_fill_percent[tank]"
        );
        assert_eq!(subject_key(names::CPU_PERCENT, Some("")), "cpu_percent");
    }
}
