//! 테스트용 인메모리 포트 구현.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use labsight_core::error::CoreError;
use labsight_core::models::anomaly::AnomalyFinding;
use labsight_core::models::capacity::CapacityPrediction;
use labsight_core::models::disk::{DiskRiskAssessment, SmartSample};
use labsight_core::models::findings::Findings;
use labsight_core::models::insight::Insight;
use labsight_core::models::metric::{subject_key, MetricSample};
use labsight_core::ports::insights_store::InsightsStore;
use labsight_core::ports::metrics_reader::MetricsReader;
use labsight_core::ports::summarizer::Summarizer;
use parking_lot::Mutex;

type SeriesKey = (String, Option<String>);

/// 인메모리 메트릭 저장소. `fail_on`으로 지정한 대상은 조회 시 실패한다.
#[derive(Default)]
pub struct MemoryMetrics {
    series: Mutex<BTreeMap<SeriesKey, Vec<MetricSample>>>,
    smart: Mutex<BTreeMap<String, Vec<SmartSample>>>,
    failing: Mutex<Vec<String>>,
}

impl MemoryMetrics {
    pub fn push(&self, metric: &str, dimension: Option<&str>, sample: MetricSample) {
        let mut series = self.series.lock();
        let entry = series
            .entry((metric.to_string(), dimension.map(str::to_string)))
            .or_default();
        entry.push(sample);
        entry.sort_by_key(|s| s.timestamp);
    }

    pub fn push_smart(&self, disk: &str, sample: SmartSample) {
        let mut smart = self.smart.lock();
        let entry = smart.entry(disk.to_string()).or_default();
        entry.push(sample);
        entry.sort_by_key(|s| s.timestamp);
    }

    /// `metric`, `metric[dim]`, `smart:disk` 형식의 대상 조회를 실패시킴
    pub fn fail_on(&self, subject: &str) {
        self.failing.lock().push(subject.to_string());
    }

    fn check(&self, subject: &str) -> Result<(), CoreError> {
        if self.failing.lock().iter().any(|s| s == subject) {
            return Err(CoreError::Storage(format!("조회 실패: {subject}")));
        }
        Ok(())
    }
}

#[async_trait]
impl MetricsReader for MemoryMetrics {
    async fn query(
        &self,
        metric: &str,
        dimension: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<MetricSample>, CoreError> {
        self.check(&subject_key(metric, dimension))?;
        let key = (metric.to_string(), dimension.map(str::to_string));
        Ok(self
            .series
            .lock()
            .get(&key)
            .map(|samples| {
                samples
                    .iter()
                    .filter(|s| s.timestamp >= since)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn dimensions(
        &self,
        metric: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<String>, CoreError> {
        self.check(metric)?;
        Ok(self
            .series
            .lock()
            .iter()
            .filter(|((name, dim), samples)| {
                name == metric && dim.is_some() && samples.iter().any(|s| s.timestamp >= since)
            })
            .filter_map(|((_, dim), _)| dim.clone())
            .collect())
    }

    async fn smart_history(
        &self,
        disk_name: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<SmartSample>, CoreError> {
        self.check(&format!("smart:{disk_name}"))?;
        Ok(self
            .smart
            .lock()
            .get(disk_name)
            .map(|samples| {
                samples
                    .iter()
                    .filter(|s| s.timestamp >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn disks(&self, since: DateTime<Utc>) -> Result<Vec<String>, CoreError> {
        self.check("smart")?;
        Ok(self
            .smart
            .lock()
            .iter()
            .filter(|(_, samples)| samples.iter().any(|s| s.timestamp >= since))
            .map(|(disk, _)| disk.clone())
            .collect())
    }
}

/// 인메모리 인사이트 저장소. 동시 upsert 수를 기록한다.
#[derive(Default)]
pub struct MemoryStore {
    anomalies: Mutex<Vec<AnomalyFinding>>,
    capacity: Mutex<Vec<CapacityPrediction>>,
    disks: Mutex<Vec<DiskRiskAssessment>>,
    insights: Mutex<BTreeMap<String, Insight>>,
    fail_writes: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryStore {
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn anomaly_count(&self) -> usize {
        self.anomalies.lock().len()
    }

    pub fn capacity_count(&self) -> usize {
        self.capacity.lock().len()
    }

    pub fn disk_count(&self) -> usize {
        self.disks.lock().len()
    }

    pub fn insight_count(&self) -> usize {
        self.insights.lock().len()
    }

    pub fn max_concurrent_upserts(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn check_write(&self) -> Result<(), CoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CoreError::Storage("쓰기 실패".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl InsightsStore for MemoryStore {
    async fn append_anomaly(&self, finding: &AnomalyFinding) -> Result<(), CoreError> {
        self.check_write()?;
        self.anomalies.lock().push(finding.clone());
        Ok(())
    }

    async fn append_capacity_prediction(
        &self,
        prediction: &CapacityPrediction,
    ) -> Result<(), CoreError> {
        self.check_write()?;
        self.capacity.lock().push(prediction.clone());
        Ok(())
    }

    async fn append_disk_prediction(
        &self,
        assessment: &DiskRiskAssessment,
    ) -> Result<(), CoreError> {
        self.check_write()?;
        self.disks.lock().push(assessment.clone());
        Ok(())
    }

    async fn anomaly_history(
        &self,
        metric: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<AnomalyFinding>, CoreError> {
        Ok(self
            .anomalies
            .lock()
            .iter()
            .filter(|f| metric.map_or(true, |m| f.metric == m) && f.detected_at >= since)
            .cloned()
            .collect())
    }

    async fn capacity_history(
        &self,
        resource: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CapacityPrediction>, CoreError> {
        Ok(self
            .capacity
            .lock()
            .iter()
            .filter(|p| p.resource == resource && p.generated_at >= since)
            .cloned()
            .collect())
    }

    async fn disk_prediction_history(
        &self,
        disk_name: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DiskRiskAssessment>, CoreError> {
        Ok(self
            .disks
            .lock()
            .iter()
            .filter(|d| d.disk_name == disk_name && d.assessed_at >= since)
            .cloned()
            .collect())
    }

    async fn upsert_insights(&self, insights: &[Insight]) -> Result<(), CoreError> {
        self.check_write()?;
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::task::yield_now().await;
        {
            let mut stored = self.insights.lock();
            for insight in insights {
                stored.insert(insight.id.clone(), insight.clone());
            }
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_insight(&self, id: &str) -> Result<Option<Insight>, CoreError> {
        Ok(self.insights.lock().get(id).cloned())
    }

    async fn active_insights(&self, now: DateTime<Utc>) -> Result<Vec<Insight>, CoreError> {
        Ok(self
            .insights
            .lock()
            .values()
            .filter(|i| !i.is_expired(now))
            .cloned()
            .collect())
    }

    async fn purge_expired_insights(&self, now: DateTime<Utc>) -> Result<usize, CoreError> {
        let mut stored = self.insights.lock();
        let before = stored.len();
        stored.retain(|_, i| !i.is_expired(now));
        Ok(before - stored.len())
    }
}

/// 가짜 요약기 동작
#[derive(Debug, Clone)]
pub enum SummarizerBehavior {
    Text(String),
    Unavailable,
    Fail,
    /// 타임아웃보다 오래 걸림
    Hang,
}

pub struct FakeSummarizer {
    behavior: SummarizerBehavior,
    calls: AtomicUsize,
}

impl FakeSummarizer {
    pub fn new(behavior: SummarizerBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn is_available(&self) -> bool {
        !matches!(self.behavior, SummarizerBehavior::Unavailable)
    }

    async fn summarize(&self, _findings: &Findings) -> Result<String, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            SummarizerBehavior::Text(text) => Ok(text.clone()),
            SummarizerBehavior::Unavailable => Err(CoreError::Network("unavailable".to_string())),
            SummarizerBehavior::Fail => Err(CoreError::Network("500".to_string())),
            SummarizerBehavior::Hang => {
                tokio::time::sleep(StdDuration::from_secs(60)).await;
                Ok("too late".to_string())
            }
        }
    }

    fn provider_name(&self) -> &str {
        "fake"
    }
}
