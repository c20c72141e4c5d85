//! 다주간 성능 추세 분류.
//!
//! 변동계수가 크면 volatile, 아니면 첫 주와 최근 주 평균의 변화율로
//! degrading / improving / stable을 가른다.

use chrono::Duration;
use labsight_core::config::{TrendMetric, TrendPolicy};
use labsight_core::models::metric::{values, MetricSample};
use labsight_core::models::trend::{PerformanceTrend, TrendDirection};

use crate::stats;

/// 성능 추세 분석기
#[derive(Debug, Clone)]
pub struct TrendAnalyzer<'a> {
    policy: &'a TrendPolicy,
}

impl<'a> TrendAnalyzer<'a> {
    pub fn new(policy: &'a TrendPolicy) -> Self {
        Self { policy }
    }

    /// 기간 내 샘플의 추세 분류. 샘플이 2개 미만이면 `None`.
    pub fn analyze(
        &self,
        metric: &TrendMetric,
        dimension: Option<&str>,
        samples: &[MetricSample],
        period_days: u32,
    ) -> Option<PerformanceTrend> {
        if samples.len() < 2 {
            return None;
        }

        let all = values(samples);
        let average = stats::mean(&all);
        let std_deviation = stats::std_dev(&all);
        let (first_week, last_week) = self.week_averages(samples);
        let change_percent = stats::percent_change(last_week, first_week);

        let coefficient = if average == 0.0 {
            0.0
        } else {
            std_deviation / average.abs()
        };

        let trend = if coefficient > self.policy.volatility_ratio {
            TrendDirection::Volatile
        } else if change_percent > self.policy.change_threshold_percent {
            TrendDirection::Degrading
        } else if change_percent < -self.policy.change_threshold_percent {
            TrendDirection::Improving
        } else {
            TrendDirection::Stable
        };

        let analysis = match trend {
            TrendDirection::Volatile => format!(
                "{} is volatile: standard deviation {std_deviation:.2} is {:.0}% of the mean {average:.2}",
                metric.label,
                coefficient * 100.0
            ),
            _ => format!(
                "{} is {} over {period_days} days: recent week average {last_week:.2} vs first week {first_week:.2} ({change_percent:+.1}%)",
                metric.label,
                trend.as_str()
            ),
        };

        let recommendations = match trend {
            TrendDirection::Degrading => vec![metric.degrading_recommendation.clone()],
            TrendDirection::Volatile => vec![metric.volatile_recommendation.clone()],
            _ => Vec::new(),
        };

        Some(PerformanceTrend {
            metric: metric.name.clone(),
            dimension: dimension.map(str::to_string),
            period_days,
            trend,
            average,
            min: stats::min(&all),
            max: stats::max(&all),
            std_deviation,
            variance: std_deviation * std_deviation,
            change_percent,
            analysis,
            recommendations,
        })
    }

    /// (첫 주 평균, 최근 주 평균)
    ///
    /// 첫 주는 첫 샘플부터 `week_days` 이내, 최근 주는 마지막 샘플까지 `week_days` 이내.
    fn week_averages(&self, samples: &[MetricSample]) -> (f64, f64) {
        let week = Duration::days(i64::from(self.policy.week_days.max(1)));
        let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
            return (0.0, 0.0);
        };

        let first_cutoff = first.timestamp + week;
        let last_cutoff = last.timestamp - week;

        let first_week: Vec<f64> = samples
            .iter()
            .filter(|s| s.timestamp < first_cutoff)
            .map(|s| s.value)
            .collect();
        let last_week: Vec<f64> = samples
            .iter()
            .filter(|s| s.timestamp > last_cutoff)
            .map(|s| s.value)
            .collect();

        (stats::mean(&first_week), stats::mean(&last_week))
    }
}
