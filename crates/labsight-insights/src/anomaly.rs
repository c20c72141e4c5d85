//! z-score 기반 이상 탐지기.
//!
//! 최신 샘플을 포함한 윈도우 전체의 평균/표준편차로 최신 샘플의 z-score를 구한다.
//! 샘플이 부족하거나 분산이 0이면 아무것도 보고하지 않는다 (에러 아님).

use chrono::{DateTime, Utc};
use labsight_core::config::{AnomalyPolicy, TrackedMetric};
use labsight_core::models::anomaly::{AnomalyFinding, AnomalyKind, AnomalySeverity};
use labsight_core::models::metric::{subject_key, values, MetricSample};
use tracing::debug;

use crate::stats;

/// 이상 탐지기
#[derive(Debug, Clone)]
pub struct AnomalyDetector<'a> {
    policy: &'a AnomalyPolicy,
}

impl<'a> AnomalyDetector<'a> {
    pub fn new(policy: &'a AnomalyPolicy) -> Self {
        Self { policy }
    }

    /// 최신 샘플 평가
    ///
    /// `samples`는 타임스탬프 오름차순이어야 한다.
    pub fn evaluate(
        &self,
        metric: &TrackedMetric,
        dimension: Option<&str>,
        samples: &[MetricSample],
        now: DateTime<Utc>,
    ) -> Option<AnomalyFinding> {
        if samples.len() < self.policy.min_samples.max(2) {
            return None;
        }

        let latest = samples.last()?;
        let window = values(samples);
        let mean = stats::mean(&window);
        let std_dev = stats::std_dev(&window);
        let z = stats::z_score(latest.value, mean, std_dev);

        if z.abs() <= self.policy.z_threshold {
            return None;
        }

        let severity = if z.abs() > self.policy.high_z_threshold {
            AnomalySeverity::High
        } else {
            AnomalySeverity::Medium
        };
        let kind = if latest.value > mean {
            AnomalyKind::Spike
        } else {
            AnomalyKind::Drop
        };
        let deviation_percent = stats::percent_deviation(latest.value, mean);

        let subject = subject_key(&metric.name, dimension);
        debug!(
            subject = %subject,
            z = z,
            current = latest.value,
            mean = mean,
            "이상 감지"
        );

        Some(AnomalyFinding {
            metric: metric.name.clone(),
            dimension: dimension.map(str::to_string),
            kind,
            severity,
            current_value: latest.value,
            expected_value: mean,
            deviation_percent,
            z_score: z,
            description: describe(metric, dimension, kind, latest.value, mean, z),
            recommendation: metric.recommendation.clone(),
            detected_at: now,
        })
    }
}

fn describe(
    metric: &TrackedMetric,
    dimension: Option<&str>,
    kind: AnomalyKind,
    current: f64,
    mean: f64,
    z: f64,
) -> String {
    let direction = match kind {
        AnomalyKind::Spike => "spiked",
        AnomalyKind::Drop => "dropped",
        AnomalyKind::Trend => "drifted",
        AnomalyKind::Pattern => "broke its usual pattern",
    };
    let target = match dimension {
        Some(dim) => format!("{} on {}", metric.label, dim),
        None => metric.label.clone(),
    };
    format!(
        "{target} {direction} to {current:.1} (expected around {mean:.1}, z-score {z:.2})"
    )
}
