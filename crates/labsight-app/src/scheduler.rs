//! 분석 스케줄러.
//!
//! 고정 주기로 분석 주기를 돌리고, 이어서 보존 정책과 만료 인사이트 정리를 수행한다.
//! 이전 주기가 길어져 놓친 틱은 건너뛴다.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use labsight_core::config::SchedulerConfig;
use labsight_core::error::CoreError;
use labsight_core::models::insight::InsightReport;
use labsight_core::ports::insights_store::InsightsStore;
use labsight_insights::InsightEngine;
use labsight_storage::sqlite::SqliteStorage;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// 분석 스케줄러
pub struct AnalysisScheduler {
    engine: Arc<InsightEngine>,
    storage: Arc<SqliteStorage>,
    interval: Duration,
    run_on_start: bool,
    completed: AtomicU64,
}

impl AnalysisScheduler {
    pub fn new(
        engine: Arc<InsightEngine>,
        storage: Arc<SqliteStorage>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            engine,
            storage,
            interval: config.interval(),
            run_on_start: config.run_on_start,
            completed: AtomicU64::new(0),
        }
    }

    /// 완료된 주기 수
    pub fn completed_cycles(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// 분석 1회 + 정리
    ///
    /// 정리 실패는 경고로만 남긴다. 분석 주기의 영속화 실패는 그대로 반환된다.
    pub async fn run_once(&self) -> Result<InsightReport, CoreError> {
        let report = self.engine.generate().await?;
        self.completed.fetch_add(1, Ordering::Relaxed);

        let now = Utc::now();
        match self.storage.enforce_retention(now) {
            Ok(deleted) => debug!(deleted, "보존 정책 적용 완료"),
            Err(e) => warn!("보존 정책 적용 실패: {e}"),
        }
        match self.storage.purge_expired_insights(now).await {
            Ok(purged) => debug!(purged, "만료 인사이트 정리 완료"),
            Err(e) => warn!("만료 인사이트 정리 실패: {e}"),
        }

        Ok(report)
    }

    /// 종료 신호까지 주기 실행
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            run_on_start = self.run_on_start,
            "분석 스케줄러 시작"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        if !self.run_on_start {
            // 첫 틱은 즉시 완료된다
            interval.tick().await;
        }

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.run_once().await {
                        Ok(report) => info!(
                            insights = report.insights.len(),
                            failures = report.failures.len(),
                            "{}",
                            report.narrative
                        ),
                        Err(e) => error!("분석 주기 실패: {e}"),
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("분석 스케줄러 종료");
                        break;
                    }
                }
            }
        }
    }
}
