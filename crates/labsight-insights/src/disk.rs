//! SMART 히스토리 기반 디스크 고장 위험 평가.
//!
//! 가산 점수 방식: 각 위험 요인이 가중치를 더하고 결과는 [0, 100]으로 자른다.
//! 같은 조건에서 섹터 수가 늘거나 건강 판정이 실패로 바뀌면 점수는 절대
//! 내려가지 않는다.

use chrono::{DateTime, Utc};
use labsight_core::config::DiskPolicy;
use labsight_core::models::disk::{DiskRiskAssessment, SmartSample, INSUFFICIENT_DATA_FACTOR};
use tracing::debug;

use crate::stats;

const HOURS_PER_YEAR: f64 = 8_760.0;

/// 디스크 고장 예측기
#[derive(Debug, Clone)]
pub struct DiskFailurePredictor<'a> {
    policy: &'a DiskPolicy,
}

impl<'a> DiskFailurePredictor<'a> {
    pub fn new(policy: &'a DiskPolicy) -> Self {
        Self { policy }
    }

    /// SMART 샘플 히스토리로 위험 평가 (`samples`는 시간 오름차순)
    pub fn assess(
        &self,
        disk_name: &str,
        samples: &[SmartSample],
        now: DateTime<Utc>,
    ) -> DiskRiskAssessment {
        let Some(latest) = samples.last().filter(|_| samples.len() >= 2) else {
            debug!(disk = disk_name, points = samples.len(), "디스크 평가: 히스토리 부족");
            return DiskRiskAssessment {
                disk_name: disk_name.to_string(),
                failure_probability: 0.0,
                days_until_failure: None,
                confidence: 0.0,
                contributing_factors: vec![INSUFFICIENT_DATA_FACTOR.to_string()],
                recommended_action: self.recommended_action(0.0),
                data_points: samples.len(),
                assessed_at: now,
            };
        };

        let policy = self.policy;
        let mut probability = 0.0;
        let mut factors = Vec::new();

        let reallocated: Vec<f64> = samples
            .iter()
            .map(|s| s.reallocated_sectors as f64)
            .collect();
        let reallocated_slope = stats::linear_slope(&stats::indexed(&reallocated));

        if latest.reallocated_sectors > 0 {
            probability += policy.reallocated_weight;
            let qualifier = if reallocated_slope > 0.0 {
                "increasing"
            } else {
                "stable"
            };
            factors.push(format!(
                "{} reallocated sectors ({qualifier})",
                latest.reallocated_sectors
            ));
        }

        if latest.pending_sectors > 0 {
            probability += policy.pending_weight;
            factors.push(format!("{} pending sectors", latest.pending_sectors));
        }

        let temperatures: Vec<f64> = samples
            .iter()
            .filter_map(|s| s.temperature_celsius)
            .collect();
        if !temperatures.is_empty() {
            let avg = stats::mean(&temperatures);
            if avg > policy.temperature_threshold_celsius {
                probability += policy.temperature_weight;
                factors.push(format!("High average temperature ({avg:.1}°C)"));

                let temp_slope = stats::linear_slope(&stats::indexed(&temperatures));
                if temp_slope > policy.temperature_slope_threshold {
                    probability += policy.temperature_rising_weight;
                    factors.push(format!(
                        "Temperature rising ({temp_slope:.2}°C per sample)"
                    ));
                }
            }
        }

        // 최신 샘플에 값이 없으면 마지막으로 관측된 값을 쓴다
        if let Some(hours) = samples.iter().rev().find_map(|s| s.power_on_hours) {
            let years = hours as f64 / HOURS_PER_YEAR;
            if years > policy.age_threshold_years {
                probability += policy.age_weight;
                factors.push(format!("Drive age {years:.1} years"));
            }
        }

        if latest.health_passed == Some(false) {
            probability += policy.health_failed_weight;
            factors.push("SMART overall health check FAILED".to_string());
        }

        let failure_probability: f64 = probability.clamp(0.0, 100.0);

        let days_until_failure = if reallocated_slope > 0.0 {
            let remaining =
                (policy.critical_reallocated_sectors - latest.reallocated_sectors as f64)
                    / reallocated_slope;
            Some((remaining.floor() as i64).max(1))
        } else if failure_probability > policy.replace_threshold {
            Some(policy.replace_default_days)
        } else if failure_probability > policy.precaution_threshold {
            Some(policy.precaution_default_days)
        } else {
            None
        };

        // 경험적 휴리스틱: 샘플 수 비례, 위험 요인이 없으면 절반
        let factor_weight = if factors.is_empty() { 0.5 } else { 1.0 };
        let full = policy.full_confidence_points.max(1) as f64;
        let confidence = (samples.len() as f64 / full * 100.0 * factor_weight).min(100.0);

        debug!(
            disk = disk_name,
            probability = failure_probability,
            factors = factors.len(),
            "디스크 위험 평가 완료"
        );

        DiskRiskAssessment {
            disk_name: disk_name.to_string(),
            failure_probability,
            days_until_failure,
            confidence,
            contributing_factors: factors,
            recommended_action: self.recommended_action(failure_probability),
            data_points: samples.len(),
            assessed_at: now,
        }
    }

    fn recommended_action(&self, probability: f64) -> String {
        let policy = self.policy;
        let action = if probability > policy.replace_threshold {
            "Order a replacement drive immediately and verify backups before it fails"
        } else if probability > policy.precaution_threshold {
            "Order a replacement drive as a precaution and schedule an extended SMART test"
        } else if probability > policy.monitor_threshold {
            "Monitor this drive closely and review SMART data weekly"
        } else {
            "Continue regular monitoring"
        };
        action.to_string()
    }
}
