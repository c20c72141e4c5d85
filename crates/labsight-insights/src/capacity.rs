//! 용량 소진 예측.
//!
//! 원시 샘플을 UTC 날짜별 평균으로 집계한 뒤 일별 사용량에 최소제곱 직선을
//! 맞춰 소진 시점을 외삽한다.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use labsight_core::config::{CapacityPolicy, CapacityResource};
use labsight_core::models::capacity::{CapacityPrediction, UsagePoint};
use labsight_core::models::metric::MetricSample;
use tracing::debug;

use crate::stats;

/// 사용량/용량 샘플을 일별 포인트로 집계
///
/// 용량 샘플이 없는 날은 가장 가까운 이전 날의 용량을 쓰고, 첫 용량 관측 이전의
/// 날은 첫 관측값을 쓴다. 용량 샘플이 하나도 없으면 빈 목록을 반환한다.
pub fn aggregate_daily(used: &[MetricSample], capacity: &[MetricSample]) -> Vec<UsagePoint> {
    let used_by_day = daily_means(used);
    let capacity_by_day = daily_means(capacity);

    let Some(first_capacity) = capacity_by_day.values().next().copied() else {
        return Vec::new();
    };

    let mut last_capacity = first_capacity;
    used_by_day
        .into_iter()
        .map(|(day, used)| {
            if let Some((_, cap)) = capacity_by_day.range(..=day).next_back() {
                last_capacity = *cap;
            }
            UsagePoint {
                day,
                used,
                capacity: last_capacity,
            }
        })
        .collect()
}

fn daily_means(samples: &[MetricSample]) -> BTreeMap<NaiveDate, f64> {
    let mut buckets: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for sample in samples {
        let entry = buckets
            .entry(sample.timestamp.date_naive())
            .or_insert((0.0, 0));
        entry.0 += sample.value;
        entry.1 += 1;
    }
    buckets
        .into_iter()
        .map(|(day, (sum, count))| (day, sum / count as f64))
        .collect()
}

/// 용량 예측기
#[derive(Debug, Clone)]
pub struct CapacityForecaster<'a> {
    policy: &'a CapacityPolicy,
}

impl<'a> CapacityForecaster<'a> {
    pub fn new(policy: &'a CapacityPolicy) -> Self {
        Self { policy }
    }

    /// 일별 포인트로 소진 시점 예측
    ///
    /// 포인트가 `min_data_points` 미만이면 `None` (데이터 부족, 에러 아님).
    pub fn forecast(
        &self,
        resource: &str,
        spec: &CapacityResource,
        points: &[UsagePoint],
        now: DateTime<Utc>,
    ) -> Option<CapacityPrediction> {
        if points.len() < self.policy.min_data_points.max(2) {
            debug!(
                resource,
                points = points.len(),
                "용량 예측 건너뜀: 데이터 부족"
            );
            return None;
        }
        let latest = points.last()?;

        let series: Vec<(f64, f64)> = points
            .iter()
            .enumerate()
            .map(|(i, p)| (i as f64, p.used))
            .collect();
        let slope = stats::linear_slope(&series);

        let current_usage_percent = if latest.capacity > 0.0 {
            latest.used / latest.capacity * 100.0
        } else {
            0.0
        };

        let days_until_full = if slope > 0.0 {
            let remaining = (latest.capacity - latest.used) / slope;
            Some((remaining.floor() as i64).max(1))
        } else {
            None
        };
        // 기울기가 아주 작으면 일수가 날짜 표현 범위를 넘는다. 그때는 날짜 없이 일수만 보고
        let predicted_full_date = days_until_full
            .and_then(Duration::try_days)
            .and_then(|until| now.checked_add_signed(until));

        let confidence = if points.len() >= self.policy.high_confidence_points {
            self.policy.high_confidence
        } else {
            self.policy.base_confidence
        };

        let recommendations = match days_until_full {
            Some(days) if days < self.policy.recommendation_horizon_days => {
                let mut recs = Vec::with_capacity(spec.recommendations.len() + 1);
                if days <= 14 {
                    recs.push(format!(
                        "Free space or add capacity now: {resource} is projected to be full in {days} days"
                    ));
                }
                recs.extend(spec.recommendations.iter().cloned());
                recs
            }
            _ => Vec::new(),
        };

        let trend_analysis = match (days_until_full, predicted_full_date) {
            (Some(days), Some(date)) => format!(
                "Usage is growing by {slope:.2} per day; {resource} is projected to be full in {days} days ({})",
                date.format("%Y-%m-%d")
            ),
            (Some(days), None) => format!(
                "Usage is growing by {slope:.2} per day; {resource} is projected to be full in {days} days"
            ),
            (None, _) => format!(
                "Usage is stable or decreasing ({slope:.2} per day); no exhaustion is projected"
            ),
        };

        Some(CapacityPrediction {
            resource: resource.to_string(),
            current_usage: latest.used,
            current_usage_percent,
            growth_rate_per_day: slope,
            predicted_full_date,
            days_until_full,
            confidence,
            recommendations,
            trend_analysis,
            data_points: points.len(),
            generated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(offset: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + Duration::days(offset)
    }

    fn points(used: &[f64], capacity: f64) -> Vec<UsagePoint> {
        used.iter()
            .enumerate()
            .map(|(i, &u)| UsagePoint {
                day: day(i as i64).date_naive(),
                used: u,
                capacity,
            })
            .collect()
    }

    fn storage() -> CapacityResource {
        CapacityPolicy::default()
            .resource("storage")
            .cloned()
            .unwrap()
    }

    #[test]
    fn linear_growth_days_until_full() {
        let policy = CapacityPolicy::default();
        let forecaster = CapacityForecaster::new(&policy);
        // 50% → 90%, 하루 4%씩 (11 포인트)
        let used: Vec<f64> = (0..=10).map(|i| 50.0 + 4.0 * i as f64).collect();

        let prediction = forecaster
            .forecast("storage", &storage(), &points(&used, 100.0), day(10))
            .unwrap();

        assert!((prediction.growth_rate_per_day - 4.0).abs() < 1e-9);
        // floor((100 - 90) / 4) = 2
        assert_eq!(prediction.days_until_full, Some(2));
        assert_eq!(prediction.predicted_full_date, Some(day(12)));
        assert!((prediction.current_usage_percent - 90.0).abs() < 1e-9);
        assert_eq!(prediction.confidence, policy.base_confidence);
        assert!(prediction.recommendations[0].contains("2 days"));
    }

    #[test]
    fn non_positive_slope_never_predicts_exhaustion() {
        let policy = CapacityPolicy::default();
        let forecaster = CapacityForecaster::new(&policy);

        for used in [vec![70.0; 10], (0..10).map(|i| 80.0 - i as f64).collect()] {
            let prediction = forecaster
                .forecast("storage", &storage(), &points(&used, 100.0), day(9))
                .unwrap();
            assert_eq!(prediction.days_until_full, None);
            assert_eq!(prediction.predicted_full_date, None);
            assert!(prediction.recommendations.is_empty());
            assert!(prediction.trend_analysis.contains("stable or decreasing"));
        }
    }

    #[test]
    fn too_few_points_is_none() {
        let policy = CapacityPolicy::default();
        let forecaster = CapacityForecaster::new(&policy);
        let used = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0];
        assert!(forecaster
            .forecast("storage", &storage(), &points(&used, 100.0), day(6))
            .is_none());
    }

    #[test]
    fn confidence_rises_with_thirty_points() {
        let policy = CapacityPolicy::default();
        let forecaster = CapacityForecaster::new(&policy);
        let used: Vec<f64> = (0..30).map(|i| 60.0 + i as f64).collect();

        let prediction = forecaster
            .forecast("storage", &storage(), &points(&used, 100.0), day(29))
            .unwrap();
        assert_eq!(prediction.confidence, 0.9);
        assert_eq!(prediction.data_points, 30);
        // 최신값 89 기준 floor((100 - 89) / 1)
        assert_eq!(prediction.days_until_full, Some(11));
    }

    #[test]
    fn distant_exhaustion_has_no_recommendations() {
        let policy = CapacityPolicy::default();
        let forecaster = CapacityForecaster::new(&policy);
        let used: Vec<f64> = (0..10).map(|i| 10.0 + 0.1 * i as f64).collect();

        let prediction = forecaster
            .forecast("storage", &storage(), &points(&used, 100.0), day(9))
            .unwrap();
        assert!(prediction.days_until_full.unwrap() >= 90);
        assert!(prediction.recommendations.is_empty());
    }

    #[test]
    fn tiny_growth_on_byte_pool_does_not_overflow() {
        let policy = CapacityPolicy::default();
        let forecaster = CapacityForecaster::new(&policy);
        // 1TB 풀에서 하루 1바이트씩 증가
        let used: Vec<f64> = (0..10).map(|i| 5e11 + i as f64).collect();

        let prediction = forecaster
            .forecast("storage", &storage(), &points(&used, 1e12), day(9))
            .unwrap();
        let days = prediction.days_until_full.unwrap();
        assert!(days > 1_000_000_000);
        assert_eq!(prediction.predicted_full_date, None);
        assert!(prediction.recommendations.is_empty());
        assert!(prediction.trend_analysis.contains("projected to be full"));
    }

    #[test]
    fn zero_capacity_reports_zero_percent() {
        let policy = CapacityPolicy::default();
        let forecaster = CapacityForecaster::new(&policy);
        let used: Vec<f64> = (0..8).map(|i| i as f64).collect();

        let prediction = forecaster
            .forecast("storage", &storage(), &points(&used, 0.0), day(7))
            .unwrap();
        assert_eq!(prediction.current_usage_percent, 0.0);
        assert_eq!(prediction.days_until_full, Some(1));
    }

    #[test]
    fn daily_aggregation_averages_and_carries_capacity() {
        let used = vec![
            MetricSample::new(day(0), 10.0),
            MetricSample::new(day(0) + Duration::hours(3), 20.0),
            MetricSample::new(day(1), 30.0),
            MetricSample::new(day(2), 40.0),
        ];
        let capacity = vec![
            MetricSample::new(day(1), 100.0),
            MetricSample::new(day(2) + Duration::hours(1), 200.0),
        ];

        let points = aggregate_daily(&used, &capacity);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].used, 15.0);
        // 첫 관측 이전 날은 첫 관측값
        assert_eq!(points[0].capacity, 100.0);
        assert_eq!(points[1].capacity, 100.0);
        assert_eq!(points[2].capacity, 200.0);
    }

    #[test]
    fn aggregation_without_capacity_is_empty() {
        let used = vec![MetricSample::new(day(0), 10.0)];
        assert!(aggregate_daily(&used, &[]).is_empty());
    }
}
