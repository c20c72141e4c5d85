//! 애플리케이션 설정 구조체.
//!
//! 저장소 경로, 분석 주기, 분석 정책 임계값, 요약기 연결 설정을 정의한다.
//! 임계값은 데이터에서 유도된 값이 아닌 정책 상수이므로 모두 설정으로 노출해
//! 테스트에서 경계값을 정확히 조절할 수 있게 한다.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::metric::names;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 로컬 저장소 설정
    #[serde(default)]
    pub storage: StorageConfig,
    /// 분석 스케줄 설정
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// 분석 정책
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    /// 요약기 설정
    #[serde(default)]
    pub summarizer: SummarizerConfig,
}

impl AppConfig {
    /// 기본 설정
    pub fn default_config() -> Self {
        Self::default()
    }
}

// ============================================================
// 저장소 / 스케줄 설정
// ============================================================

/// 로컬 저장소 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite 파일 경로 (None이면 플랫폼 기본 경로)
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    /// 원시 샘플/히스토리 보존 기간 (일)
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            retention_days: default_retention_days(),
        }
    }
}

fn default_retention_days() -> u32 {
    90
}

/// 분석 스케줄 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// 분석 주기 (초)
    #[serde(default = "default_analysis_interval_secs")]
    pub interval_secs: u64,
    /// 시작 직후 1회 실행 여부
    #[serde(default = "default_true")]
    pub run_on_start: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_analysis_interval_secs(),
            run_on_start: true,
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs.max(1))
    }
}

fn default_analysis_interval_secs() -> u64 {
    900 // 15분
}

fn default_true() -> bool {
    true
}

// ============================================================
// 분석 정책
// ============================================================

/// 분석 정책 묶음
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default)]
    pub anomaly: AnomalyPolicy,
    #[serde(default)]
    pub capacity: CapacityPolicy,
    #[serde(default)]
    pub disk: DiskPolicy,
    #[serde(default)]
    pub trend: TrendPolicy,
    #[serde(default)]
    pub cost: CostPolicy,
    #[serde(default)]
    pub insights: InsightPolicy,
}

/// 이상 탐지 대상 메트릭
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedMetric {
    /// 메트릭 이름
    pub name: String,
    /// 표시 이름
    pub label: String,
    /// 이상 발생 시 권장 조치
    pub recommendation: String,
}

impl TrackedMetric {
    pub fn new(name: &str, label: &str, recommendation: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            recommendation: recommendation.to_string(),
        }
    }
}

/// 이상 탐지 정책
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyPolicy {
    /// 기준 분포 윈도우 (시간)
    pub window_hours: u32,
    /// 최소 샘플 수 (미만이면 조용히 건너뜀)
    pub min_samples: usize,
    /// 이상 판정 |z| 임계값
    pub z_threshold: f64,
    /// `high` 심각도 |z| 임계값
    pub high_z_threshold: f64,
    /// 추적 메트릭
    pub tracked_metrics: Vec<TrackedMetric>,
}

impl Default for AnomalyPolicy {
    fn default() -> Self {
        Self {
            window_hours: 24,
            min_samples: 2,
            z_threshold: 2.0,
            high_z_threshold: 3.0,
            tracked_metrics: vec![
                TrackedMetric::new(
                    names::CPU_PERCENT,
                    "CPU usage",
                    "Investigate CPU-heavy processes and containers",
                ),
                TrackedMetric::new(
                    names::MEMORY_PERCENT,
                    "Memory usage",
                    "Check for memory leaks or containers without memory limits",
                ),
                TrackedMetric::new(
                    names::POOL_FILL_PERCENT,
                    "Pool fill level",
                    "Review recent writes and snapshot growth on the pool",
                ),
                TrackedMetric::new(
                    names::SMART_REALLOCATED_SECTORS,
                    "Reallocated sectors",
                    "Run an extended SMART self-test and verify backups",
                ),
                TrackedMetric::new(
                    names::SMART_PENDING_SECTORS,
                    "Pending sectors",
                    "Scrub the pool and schedule a SMART self-test",
                ),
                TrackedMetric::new(
                    names::CONTAINER_CPU_PERCENT,
                    "Container CPU usage",
                    "Review container logs for unexpected restarts or stops",
                ),
            ],
        }
    }
}

impl AnomalyPolicy {
    pub fn window(&self) -> Duration {
        Duration::hours(i64::from(self.window_hours))
    }
}

/// 용량 예측 대상 리소스
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityResource {
    /// 리소스 이름 (예: "storage")
    pub name: String,
    /// 사용량 메트릭
    pub used_metric: String,
    /// 전체 용량 메트릭
    pub capacity_metric: String,
    /// 소진 임박 시 권장 조치
    pub recommendations: Vec<String>,
}

/// 용량 예측 정책
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityPolicy {
    /// 조회 기간 (일)
    pub lookback_days: u32,
    /// 최소 일별 포인트 수
    pub min_data_points: usize,
    /// 높은 신뢰도를 부여하는 포인트 수
    pub high_confidence_points: usize,
    pub high_confidence: f64,
    pub base_confidence: f64,
    /// 권장 조치를 붙이는 소진 기한 (일)
    pub recommendation_horizon_days: i64,
    pub resources: Vec<CapacityResource>,
}

impl Default for CapacityPolicy {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            min_data_points: 7,
            high_confidence_points: 30,
            high_confidence: 0.9,
            base_confidence: 0.7,
            recommendation_horizon_days: 90,
            resources: vec![
                CapacityResource {
                    name: "storage".to_string(),
                    used_metric: names::STORAGE_USED_BYTES.to_string(),
                    capacity_metric: names::STORAGE_CAPACITY_BYTES.to_string(),
                    recommendations: vec![
                        "Delete old snapshots and unused datasets".to_string(),
                        "Plan a pool expansion or add a vdev".to_string(),
                    ],
                },
                CapacityResource {
                    name: "memory".to_string(),
                    used_metric: names::MEMORY_USED_BYTES.to_string(),
                    capacity_metric: names::MEMORY_TOTAL_BYTES.to_string(),
                    recommendations: vec![
                        "Set memory limits on the largest containers".to_string(),
                        "Plan a RAM upgrade".to_string(),
                    ],
                },
            ],
        }
    }
}

impl CapacityPolicy {
    pub fn lookback(&self) -> Duration {
        Duration::days(i64::from(self.lookback_days))
    }

    pub fn resource(&self, name: &str) -> Option<&CapacityResource> {
        self.resources.iter().find(|r| r.name == name)
    }
}

/// 디스크 고장 예측 정책 (가산 위험 점수)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskPolicy {
    pub lookback_days: u32,
    pub reallocated_weight: f64,
    pub pending_weight: f64,
    /// 평균 온도 임계값 (°C)
    pub temperature_threshold_celsius: f64,
    pub temperature_weight: f64,
    /// 샘플당 온도 상승 임계값 (°C)
    pub temperature_slope_threshold: f64,
    pub temperature_rising_weight: f64,
    pub age_threshold_years: f64,
    pub age_weight: f64,
    pub health_failed_weight: f64,
    /// 고장 임박으로 간주하는 재할당 섹터 수 (임의 기준)
    pub critical_reallocated_sectors: f64,
    /// 신뢰도 100%에 도달하는 샘플 수
    pub full_confidence_points: usize,
    pub replace_threshold: f64,
    pub precaution_threshold: f64,
    pub monitor_threshold: f64,
    /// replace 임계값 초과 시 기본 예상 일수
    pub replace_default_days: i64,
    /// precaution 임계값 초과 시 기본 예상 일수
    pub precaution_default_days: i64,
}

impl Default for DiskPolicy {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            reallocated_weight: 40.0,
            pending_weight: 30.0,
            temperature_threshold_celsius: 50.0,
            temperature_weight: 15.0,
            temperature_slope_threshold: 0.5,
            temperature_rising_weight: 10.0,
            age_threshold_years: 4.0,
            age_weight: 10.0,
            health_failed_weight: 50.0,
            critical_reallocated_sectors: 100.0,
            full_confidence_points: 30,
            replace_threshold: 70.0,
            precaution_threshold: 40.0,
            monitor_threshold: 20.0,
            replace_default_days: 30,
            precaution_default_days: 90,
        }
    }
}

impl DiskPolicy {
    pub fn lookback(&self) -> Duration {
        Duration::days(i64::from(self.lookback_days))
    }
}

/// 추세 분석 대상 메트릭
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendMetric {
    pub name: String,
    pub label: String,
    /// 악화(degrading) 시 권장 조치
    pub degrading_recommendation: String,
    /// 변동성(volatile) 시 권장 조치
    pub volatile_recommendation: String,
}

impl TrendMetric {
    pub fn new(name: &str, label: &str, degrading: &str, volatile: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            degrading_recommendation: degrading.to_string(),
            volatile_recommendation: volatile.to_string(),
        }
    }
}

/// 성능 추세 정책
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendPolicy {
    pub period_days: u32,
    /// 첫 주/최근 주 구간 길이 (일)
    pub week_days: u32,
    /// 변동계수(std/mean) 임계값
    pub volatility_ratio: f64,
    /// degrading/improving 변화율 임계값 (%)
    pub change_threshold_percent: f64,
    pub metrics: Vec<TrendMetric>,
}

impl Default for TrendPolicy {
    fn default() -> Self {
        Self {
            period_days: 30,
            week_days: 7,
            volatility_ratio: 0.5,
            change_threshold_percent: 20.0,
            metrics: vec![
                TrendMetric::new(
                    names::CPU_PERCENT,
                    "CPU usage",
                    "Identify workloads added recently and consider spreading them across hosts",
                    "Look for cron jobs or batch workloads causing bursty CPU load",
                ),
                TrendMetric::new(
                    names::MEMORY_PERCENT,
                    "Memory usage",
                    "Check for slow memory leaks and restart long-running services",
                    "Review container memory limits to smooth allocation spikes",
                ),
                TrendMetric::new(
                    names::DISK_TEMPERATURE,
                    "Disk temperature",
                    "Improve airflow around the drives and clean dust filters",
                    "Check fan curves and chassis fan health",
                ),
            ],
        }
    }
}

impl TrendPolicy {
    pub fn period(&self, period_days: u32) -> Duration {
        Duration::days(i64::from(period_days))
    }
}

/// 비용 최적화 규칙 정책
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CostPolicy {
    /// 유휴 판정 관찰 윈도우 (시간)
    pub idle_window_hours: u32,
    /// 유휴 판정 평균 CPU 임계값 (%)
    pub idle_cpu_percent: f64,
    /// 유휴 컨테이너 1개당 월 비용 (USD)
    pub idle_container_monthly_usd: f64,
    /// 정리를 권하는 스냅샷 개수
    pub snapshot_threshold: u64,
    /// 초과 스냅샷 1개당 월 비용 (USD)
    pub snapshot_monthly_usd: f64,
    /// 호스트 평균 CPU 관찰 기간 (일)
    pub cpu_window_days: u32,
    /// 저활용으로 판단하는 평균 CPU (%)
    pub underutilized_cpu_percent: f64,
    /// 호스트 월 전력/운영 비용 (USD)
    pub host_monthly_usd: f64,
}

impl Default for CostPolicy {
    fn default() -> Self {
        Self {
            idle_window_hours: 24,
            idle_cpu_percent: 1.0,
            idle_container_monthly_usd: 0.5,
            snapshot_threshold: 50,
            snapshot_monthly_usd: 0.1,
            cpu_window_days: 7,
            underutilized_cpu_percent: 20.0,
            host_monthly_usd: 30.0,
        }
    }
}

/// 인사이트 수명/ID 정책
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightPolicy {
    pub anomaly_ttl_hours: i64,
    pub capacity_ttl_hours: i64,
    pub performance_ttl_hours: i64,
    pub cost_ttl_hours: i64,
    pub general_ttl_hours: i64,
    /// 결정적 ID 생성 윈도우 (시간). 같은 윈도우 안의 재실행은 같은 ID를 만든다
    pub id_window_hours: i64,
    /// 디스크 위험 인사이트를 만드는 최소 고장 확률
    pub disk_risk_min_probability: f64,
    /// 이 확률 초과면 critical, `disk_high_probability` 초과면 high
    pub disk_critical_probability: f64,
    pub disk_high_probability: f64,
    /// 소진까지 남은 일수가 이하면 critical
    pub capacity_critical_days: i64,
    /// 소진까지 남은 일수가 이하면 high
    pub capacity_high_days: i64,
}

impl Default for InsightPolicy {
    fn default() -> Self {
        Self {
            anomaly_ttl_hours: 24,
            capacity_ttl_hours: 24 * 7,
            performance_ttl_hours: 24 * 7,
            cost_ttl_hours: 24 * 30,
            general_ttl_hours: 24 * 7,
            id_window_hours: 24,
            disk_risk_min_probability: 20.0,
            disk_critical_probability: 70.0,
            disk_high_probability: 40.0,
            capacity_critical_days: 7,
            capacity_high_days: 30,
        }
    }
}

// ============================================================
// 요약기 설정
// ============================================================

/// 요약기 API 형식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarizerProvider {
    /// Ollama (`/api/generate`)
    #[default]
    Ollama,
    /// OpenAI 호환 (`/v1/chat/completions`)
    OpenAiCompatible,
}

/// 요약기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// 요약기 사용 여부
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub provider: SummarizerProvider,
    /// API 기본 URL (예: "http://localhost:11434")
    #[serde(default = "default_summarizer_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_summarizer_model")]
    pub model: String,
    /// API 키 (OpenAI 호환 제공자만)
    #[serde(default)]
    pub api_key: Option<String>,
    /// 요약 요청 타임아웃 (밀리초)
    #[serde(default = "default_summarize_timeout_ms")]
    pub timeout_ms: u64,
    /// 가용성 확인 타임아웃 (밀리초)
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: SummarizerProvider::default(),
            endpoint: default_summarizer_endpoint(),
            model: default_summarizer_model(),
            api_key: None,
            timeout_ms: default_summarize_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl SummarizerConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }

    pub fn probe_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.probe_timeout_ms)
    }
}

fn default_summarizer_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_summarizer_model() -> String {
    "llama3.1".to_string()
}

fn default_summarize_timeout_ms() -> u64 {
    5_000
}

fn default_probe_timeout_ms() -> u64 {
    1_500
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analytics_defaults_match_policy_constants() {
        let config = AppConfig::default_config();
        let analytics = &config.analytics;

        assert_eq!(analytics.anomaly.window_hours, 24);
        assert_eq!(analytics.anomaly.z_threshold, 2.0);
        assert_eq!(analytics.anomaly.high_z_threshold, 3.0);
        assert_eq!(analytics.capacity.min_data_points, 7);
        assert_eq!(analytics.capacity.recommendation_horizon_days, 90);
        assert_eq!(analytics.disk.temperature_threshold_celsius, 50.0);
        assert_eq!(analytics.disk.age_threshold_years, 4.0);
        assert_eq!(analytics.disk.critical_reallocated_sectors, 100.0);
        assert_eq!(analytics.insights.anomaly_ttl_hours, 24);
        assert_eq!(analytics.insights.cost_ttl_hours, 720);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{
            "scheduler": { "interval_secs": 300 },
            "analytics": { "anomaly": { "z_threshold": 2.5 } }
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.scheduler.interval_secs, 300);
        assert!(config.scheduler.run_on_start);
        assert_eq!(config.analytics.anomaly.z_threshold, 2.5);
        assert_eq!(config.analytics.anomaly.high_z_threshold, 3.0);
        assert!(!config.analytics.anomaly.tracked_metrics.is_empty());
        assert_eq!(config.storage.retention_days, 90);
        assert!(!config.summarizer.enabled);
    }

    #[test]
    fn capacity_resource_lookup() {
        let policy = CapacityPolicy::default();
        assert!(policy.resource("storage").is_some());
        assert!(policy.resource("memory").is_some());
        assert!(policy.resource("gpu").is_none());
    }

    #[test]
    fn provider_serializes_snake_case() {
        let json = serde_json::to_string(&SummarizerProvider::OpenAiCompatible).unwrap();
        assert_eq!(json, "\"open_ai_compatible\"");
    }
}
