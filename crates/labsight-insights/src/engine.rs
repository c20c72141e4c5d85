//! 인사이트 엔진: 분석 주기 오케스트레이션.
//!
//! 한 주기는 `Idle → Collecting → Scoring → Persisting → Done` 순으로 진행된다.
//! 주기는 잠금으로 직렬화되어 같은 인사이트 ID에 대한 쓰기가 겹치지 않는다.
//! 분석기 하나의 저장소 실패는 해당 분석기만 실패로 기록하고 나머지는 계속된다.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use labsight_core::config::AnalyticsConfig;
use labsight_core::error::CoreError;
use labsight_core::models::anomaly::AnomalyFinding;
use labsight_core::models::capacity::CapacityPrediction;
use labsight_core::models::cost::{CostOpportunity, ResourceSnapshot};
use labsight_core::models::disk::DiskRiskAssessment;
use labsight_core::models::findings::{AnalyzerFailure, AnalyzerKind, Findings};
use labsight_core::models::insight::{Insight, InsightReport, NarrativeSource};
use labsight_core::models::metric::{names, subject_key, values};
use labsight_core::models::trend::PerformanceTrend;
use labsight_core::ports::insights_store::InsightsStore;
use labsight_core::ports::metrics_reader::MetricsReader;
use labsight_core::ports::summarizer::Summarizer;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::anomaly::AnomalyDetector;
use crate::capacity::{aggregate_daily, CapacityForecaster};
use crate::cost::CostAdvisor;
use crate::disk::DiskFailurePredictor;
use crate::scoring::{default_narrative, InsightScorer};
use crate::stats;
use crate::trend::TrendAnalyzer;

/// 기본 요약기 타임아웃
const DEFAULT_SUMMARIZER_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// 분석 주기 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Idle,
    Collecting,
    Scoring,
    Persisting,
    Done,
}

/// 분석기 하나의 수집 결과 (성공 항목 + 대상별 실패)
struct Collected<T> {
    items: Vec<T>,
    errors: Vec<(Option<String>, CoreError)>,
}

impl<T> Collected<T> {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn failed(subject: Option<String>, error: CoreError) -> Self {
        Self {
            items: Vec::new(),
            errors: vec![(subject, error)],
        }
    }

    /// 단독 접근자용: 첫 실패를 그대로 전파
    fn into_result(self) -> Result<Vec<T>, CoreError> {
        match self.errors.into_iter().next() {
            Some((_, e)) => Err(e),
            None => Ok(self.items),
        }
    }

    /// 주기용: 실패를 기록으로 변환
    fn into_parts(self, analyzer: AnalyzerKind) -> (Vec<T>, Vec<AnalyzerFailure>) {
        let failures = self
            .errors
            .into_iter()
            .map(|(subject, e)| {
                warn!(
                    analyzer = analyzer.as_str(),
                    subject = subject.as_deref().unwrap_or("-"),
                    "분석기 실패: {e}"
                );
                AnalyzerFailure {
                    analyzer,
                    subject,
                    error: e.to_string(),
                }
            })
            .collect();
        (self.items, failures)
    }
}

/// 예측 분석 엔진
///
/// `MetricsReader`로 샘플을 읽고, 순수 분석기들로 발견 사항을 만들고,
/// `InsightsStore`에 히스토리와 인사이트를 기록한다.
pub struct InsightEngine {
    config: AnalyticsConfig,
    reader: Arc<dyn MetricsReader>,
    store: Arc<dyn InsightsStore>,
    summarizer: Option<Arc<dyn Summarizer>>,
    summarizer_timeout: StdDuration,
    phase: RwLock<CyclePhase>,
    cycle_lock: Mutex<()>,
}

impl InsightEngine {
    pub fn new(
        config: AnalyticsConfig,
        reader: Arc<dyn MetricsReader>,
        store: Arc<dyn InsightsStore>,
    ) -> Self {
        Self {
            config,
            reader,
            store,
            summarizer: None,
            summarizer_timeout: DEFAULT_SUMMARIZER_TIMEOUT,
            phase: RwLock::new(CyclePhase::Idle),
            cycle_lock: Mutex::new(()),
        }
    }

    /// 선택적 요약기 연결 (`timeout`은 가용성 확인과 요약 요청 전체에 적용)
    pub fn with_summarizer(
        mut self,
        summarizer: Arc<dyn Summarizer>,
        timeout: StdDuration,
    ) -> Self {
        self.summarizer = Some(summarizer);
        self.summarizer_timeout = timeout;
        self
    }

    /// 분석 정책
    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// 현재 (또는 마지막) 주기 단계
    pub fn phase(&self) -> CyclePhase {
        *self.phase.read()
    }

    fn set_phase(&self, phase: CyclePhase) {
        *self.phase.write() = phase;
        debug!(?phase, "분석 주기 단계 전환");
    }

    /// 전체 분석 주기 실행
    pub async fn generate(&self) -> Result<InsightReport, CoreError> {
        self.generate_at(Utc::now()).await
    }

    /// 주어진 시각 기준으로 전체 분석 주기 실행
    ///
    /// 같은 입력과 같은 ID 윈도우 안의 `now`로 다시 실행하면 같은 인사이트를
    /// 같은 ID로 덮어쓴다. 영속화 실패만 에러로 반환된다.
    pub async fn generate_at(&self, now: DateTime<Utc>) -> Result<InsightReport, CoreError> {
        let _cycle = self.cycle_lock.lock().await;
        let result = self.run_cycle(now).await;
        self.set_phase(CyclePhase::Done);
        result
    }

    async fn run_cycle(&self, now: DateTime<Utc>) -> Result<InsightReport, CoreError> {
        info!("분석 주기 시작");
        self.set_phase(CyclePhase::Collecting);

        let (anomalies, capacity, disks, trends, costs) = tokio::join!(
            self.collect_anomalies(self.config.anomaly.window(), now),
            self.collect_capacity(None, now),
            self.collect_disks(now),
            self.collect_trends(self.config.trend.period_days, now),
            self.collect_costs(now),
        );

        let mut failures = Vec::new();
        let (anomalies, failed) = anomalies.into_parts(AnalyzerKind::Anomaly);
        failures.extend(failed);
        let (capacity, failed) = capacity.into_parts(AnalyzerKind::Capacity);
        failures.extend(failed);
        let (disks, failed) = disks.into_parts(AnalyzerKind::DiskFailure);
        failures.extend(failed);
        let (trends, failed) = trends.into_parts(AnalyzerKind::PerformanceTrend);
        failures.extend(failed);
        let (costs, failed) = costs.into_parts(AnalyzerKind::Cost);
        failures.extend(failed);

        let findings = Findings {
            anomalies,
            capacity,
            disks,
            trends,
            costs,
        };

        self.set_phase(CyclePhase::Scoring);
        let scorer = InsightScorer::new(
            &self.config.insights,
            self.config.capacity.recommendation_horizon_days,
        );
        let insights = scorer.score(&findings, now);

        self.set_phase(CyclePhase::Persisting);
        self.persist(&findings, &insights).await?;

        let (narrative, narrative_source) = self.narrate(&findings, &insights, &failures).await;

        info!(
            insights = insights.len(),
            failures = failures.len(),
            narrative = ?narrative_source,
            "분석 주기 완료"
        );

        Ok(InsightReport {
            generated_at: now,
            insights,
            narrative,
            narrative_source,
            failures,
        })
    }

    /// 히스토리 추가 후 인사이트 upsert (단일 흐름에서 순차 기록)
    async fn persist(&self, findings: &Findings, insights: &[Insight]) -> Result<(), CoreError> {
        for finding in &findings.anomalies {
            self.store.append_anomaly(finding).await?;
        }
        for prediction in &findings.capacity {
            self.store.append_capacity_prediction(prediction).await?;
        }
        for assessment in &findings.disks {
            self.store.append_disk_prediction(assessment).await?;
        }
        self.store.upsert_insights(insights).await?;
        debug!(insights = insights.len(), "인사이트 저장 완료");
        Ok(())
    }

    /// 요약기 호출. 실패/타임아웃/미가용이면 결정적 기본 텍스트.
    async fn narrate(
        &self,
        findings: &Findings,
        insights: &[Insight],
        failures: &[AnalyzerFailure],
    ) -> (String, NarrativeSource) {
        let fallback = default_narrative(insights, failures);
        let Some(summarizer) = &self.summarizer else {
            return (fallback, NarrativeSource::Default);
        };
        if findings.is_empty() {
            return (fallback, NarrativeSource::Default);
        }

        let call = async {
            if !summarizer.is_available().await {
                return Err(CoreError::Network(format!(
                    "요약기 사용 불가: {}",
                    summarizer.provider_name()
                )));
            }
            summarizer.summarize(findings).await
        };

        match tokio::time::timeout(self.summarizer_timeout, call).await {
            Ok(Ok(text)) if !text.trim().is_empty() => {
                debug!(provider = summarizer.provider_name(), "요약 생성 완료");
                (text.trim().to_string(), NarrativeSource::Summarizer)
            }
            Ok(Ok(_)) => {
                warn!(
                    provider = summarizer.provider_name(),
                    "요약기가 빈 응답 반환, 기본 요약 사용"
                );
                (fallback, NarrativeSource::Default)
            }
            Ok(Err(e)) => {
                warn!(provider = summarizer.provider_name(), "요약 실패, 기본 요약 사용: {e}");
                (fallback, NarrativeSource::Default)
            }
            Err(_) => {
                warn!(
                    provider = summarizer.provider_name(),
                    timeout_ms = self.summarizer_timeout.as_millis() as u64,
                    "요약 타임아웃, 기본 요약 사용"
                );
                (fallback, NarrativeSource::Default)
            }
        }
    }

    // ============================================================
    // 단독 접근자: 실패는 호출자에게 전파된다
    // ============================================================

    /// 추적 메트릭 전체에 대한 이상 탐지 (발견 사항은 히스토리에 추가)
    pub async fn detect_anomalies(
        &self,
        window: Duration,
    ) -> Result<Vec<AnomalyFinding>, CoreError> {
        self.detect_anomalies_at(window, Utc::now()).await
    }

    pub async fn detect_anomalies_at(
        &self,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<AnomalyFinding>, CoreError> {
        let findings = self.collect_anomalies(window, now).await.into_result()?;
        for finding in &findings {
            self.store.append_anomaly(finding).await?;
        }
        Ok(findings)
    }

    /// 용량 예측 (`resource`가 None이면 설정된 모든 리소스)
    pub async fn predict_capacity(
        &self,
        resource: Option<&str>,
    ) -> Result<Vec<CapacityPrediction>, CoreError> {
        self.predict_capacity_at(resource, Utc::now()).await
    }

    pub async fn predict_capacity_at(
        &self,
        resource: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<CapacityPrediction>, CoreError> {
        if let Some(name) = resource {
            if self.config.capacity.resource(name).is_none() {
                return Err(CoreError::NotFound {
                    resource_type: "CapacityResource".to_string(),
                    id: name.to_string(),
                });
            }
        }
        let predictions = self.collect_capacity(resource, now).await.into_result()?;
        for prediction in &predictions {
            self.store.append_capacity_prediction(prediction).await?;
        }
        Ok(predictions)
    }

    /// 디스크 하나의 고장 위험 평가 (평가는 항상 히스토리에 추가)
    pub async fn predict_disk_failure(
        &self,
        disk_name: &str,
    ) -> Result<DiskRiskAssessment, CoreError> {
        self.predict_disk_failure_at(disk_name, Utc::now()).await
    }

    pub async fn predict_disk_failure_at(
        &self,
        disk_name: &str,
        now: DateTime<Utc>,
    ) -> Result<DiskRiskAssessment, CoreError> {
        let assessment = self.assess_disk(disk_name, now).await?;
        self.store.append_disk_prediction(&assessment).await?;
        Ok(assessment)
    }

    /// 추세 분석 대상 메트릭 전체의 성능 추세
    pub async fn analyze_trends(
        &self,
        period_days: u32,
    ) -> Result<Vec<PerformanceTrend>, CoreError> {
        self.analyze_trends_at(period_days, Utc::now()).await
    }

    pub async fn analyze_trends_at(
        &self,
        period_days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<PerformanceTrend>, CoreError> {
        self.collect_trends(period_days, now).await.into_result()
    }

    /// 비용 절감 기회
    pub async fn cost_opportunities(&self) -> Result<Vec<CostOpportunity>, CoreError> {
        self.cost_opportunities_at(Utc::now()).await
    }

    pub async fn cost_opportunities_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<CostOpportunity>, CoreError> {
        self.collect_costs(now).await.into_result()
    }

    // ============================================================
    // 수집 (대상별 병렬)
    // ============================================================

    /// 메트릭의 차원 목록. 차원이 없으면 `[None]`.
    async fn targets(
        &self,
        metric: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Option<String>>, CoreError> {
        let dims = self.reader.dimensions(metric, since).await?;
        if dims.is_empty() {
            Ok(vec![None])
        } else {
            Ok(dims.into_iter().map(Some).collect())
        }
    }

    async fn collect_anomalies(
        &self,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Collected<AnomalyFinding> {
        let policy = &self.config.anomaly;
        let detector = AnomalyDetector::new(policy);
        let since = now - window;
        let mut collected = Collected::new();

        let mut work = Vec::new();
        for metric in &policy.tracked_metrics {
            match self.targets(&metric.name, since).await {
                Ok(dims) => work.extend(dims.into_iter().map(|dim| (metric, dim))),
                Err(e) => collected.errors.push((Some(metric.name.clone()), e)),
            }
        }

        let results = join_all(work.iter().map(|(metric, dim)| {
            let detector = &detector;
            async move {
                let samples = self.reader.query(&metric.name, dim.as_deref(), since).await?;
                Ok::<_, CoreError>(detector.evaluate(metric, dim.as_deref(), &samples, now))
            }
        }))
        .await;

        for ((metric, dim), result) in work.iter().zip(results) {
            match result {
                Ok(Some(finding)) => collected.items.push(finding),
                Ok(None) => {}
                Err(e) => collected
                    .errors
                    .push((Some(subject_key(&metric.name, dim.as_deref())), e)),
            }
        }
        collected
    }

    async fn collect_capacity(
        &self,
        only: Option<&str>,
        now: DateTime<Utc>,
    ) -> Collected<CapacityPrediction> {
        let policy = &self.config.capacity;
        let forecaster = CapacityForecaster::new(policy);
        let since = now - policy.lookback();
        let mut collected = Collected::new();

        let mut work = Vec::new();
        for spec in policy
            .resources
            .iter()
            .filter(|r| only.map_or(true, |name| r.name == name))
        {
            match self.targets(&spec.used_metric, since).await {
                Ok(dims) => work.extend(dims.into_iter().map(|dim| (spec, dim))),
                Err(e) => collected.errors.push((Some(spec.name.clone()), e)),
            }
        }

        let results = join_all(work.iter().map(|(spec, dim)| {
            let forecaster = &forecaster;
            async move {
                let used = self.reader.query(&spec.used_metric, dim.as_deref(), since).await?;
                let capacity = self
                    .reader
                    .query(&spec.capacity_metric, dim.as_deref(), since)
                    .await?;
                let points = aggregate_daily(&used, &capacity);
                let label = subject_key(&spec.name, dim.as_deref());
                Ok::<_, CoreError>(forecaster.forecast(&label, spec, &points, now))
            }
        }))
        .await;

        for ((spec, dim), result) in work.iter().zip(results) {
            match result {
                Ok(Some(prediction)) => collected.items.push(prediction),
                Ok(None) => {}
                Err(e) => collected
                    .errors
                    .push((Some(subject_key(&spec.name, dim.as_deref())), e)),
            }
        }
        collected
    }

    async fn assess_disk(
        &self,
        disk_name: &str,
        now: DateTime<Utc>,
    ) -> Result<DiskRiskAssessment, CoreError> {
        let policy = &self.config.disk;
        let samples = self
            .reader
            .smart_history(disk_name, now - policy.lookback())
            .await?;
        Ok(DiskFailurePredictor::new(policy).assess(disk_name, &samples, now))
    }

    async fn collect_disks(&self, now: DateTime<Utc>) -> Collected<DiskRiskAssessment> {
        let since = now - self.config.disk.lookback();
        let disks = match self.reader.disks(since).await {
            Ok(disks) => disks,
            Err(e) => return Collected::failed(None, e),
        };

        let results = join_all(disks.iter().map(|disk| self.assess_disk(disk, now))).await;

        let mut collected = Collected::new();
        for (disk, result) in disks.into_iter().zip(results) {
            match result {
                Ok(assessment) => collected.items.push(assessment),
                Err(e) => collected.errors.push((Some(disk), e)),
            }
        }
        collected
    }

    async fn collect_trends(
        &self,
        period_days: u32,
        now: DateTime<Utc>,
    ) -> Collected<PerformanceTrend> {
        let policy = &self.config.trend;
        let analyzer = TrendAnalyzer::new(policy);
        let since = now - policy.period(period_days);
        let mut collected = Collected::new();

        let mut work = Vec::new();
        for metric in &policy.metrics {
            match self.targets(&metric.name, since).await {
                Ok(dims) => work.extend(dims.into_iter().map(|dim| (metric, dim))),
                Err(e) => collected.errors.push((Some(metric.name.clone()), e)),
            }
        }

        let results = join_all(work.iter().map(|(metric, dim)| {
            let analyzer = &analyzer;
            async move {
                let samples = self.reader.query(&metric.name, dim.as_deref(), since).await?;
                Ok::<_, CoreError>(analyzer.analyze(
                    metric,
                    dim.as_deref(),
                    &samples,
                    period_days,
                ))
            }
        }))
        .await;

        for ((metric, dim), result) in work.iter().zip(results) {
            match result {
                Ok(Some(trend)) => collected.items.push(trend),
                Ok(None) => {}
                Err(e) => collected
                    .errors
                    .push((Some(subject_key(&metric.name, dim.as_deref())), e)),
            }
        }
        collected
    }

    async fn collect_costs(&self, now: DateTime<Utc>) -> Collected<CostOpportunity> {
        match self.resource_snapshot(now).await {
            Ok(snapshot) => Collected {
                items: CostAdvisor::new(&self.config.cost).advise(&snapshot),
                errors: Vec::new(),
            },
            Err(e) => Collected::failed(None, e),
        }
    }

    /// 비용 규칙 입력 스냅샷 구성
    async fn resource_snapshot(&self, now: DateTime<Utc>) -> Result<ResourceSnapshot, CoreError> {
        let policy = &self.config.cost;
        let advisor = CostAdvisor::new(policy);

        let idle_since = now - Duration::hours(i64::from(policy.idle_window_hours));
        let containers = self
            .reader
            .dimensions(names::CONTAINER_CPU_PERCENT, idle_since)
            .await?;
        let usage = join_all(containers.iter().map(|name| {
            self.reader
                .query(names::CONTAINER_CPU_PERCENT, Some(name.as_str()), idle_since)
        }))
        .await;

        let mut idle_containers = Vec::new();
        for (name, samples) in containers.into_iter().zip(usage) {
            if advisor.is_idle(&samples?) {
                idle_containers.push(name);
            }
        }

        let cpu_since = now - Duration::days(i64::from(policy.cpu_window_days));
        let snapshot_count = self
            .reader
            .query(names::SNAPSHOT_COUNT, None, cpu_since)
            .await?
            .last()
            .map(|s| s.value.max(0.0).round() as u64);
        let cpu = self.reader.query(names::CPU_PERCENT, None, cpu_since).await?;
        let avg_cpu_percent = (!cpu.is_empty()).then(|| stats::mean(&values(&cpu)));

        Ok(ResourceSnapshot {
            idle_containers,
            snapshot_count,
            avg_cpu_percent,
        })
    }
}
