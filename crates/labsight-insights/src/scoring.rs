//! 발견 사항 → 인사이트 점수화.
//!
//! 분석기 출력을 운영자용 인사이트로 변환하고, 결정적 ID를 부여하고,
//! 심각도 순으로 정렬하며 ID 기준으로 중복을 제거한다.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use labsight_core::config::InsightPolicy;
use labsight_core::models::anomaly::AnomalyFinding;
use labsight_core::models::capacity::CapacityPrediction;
use labsight_core::models::cost::CostOpportunity;
use labsight_core::models::disk::DiskRiskAssessment;
use labsight_core::models::findings::{AnalyzerFailure, Findings};
use labsight_core::models::insight::{Insight, InsightSeverity, InsightType};
use labsight_core::models::metric::subject_key;
use labsight_core::models::trend::{PerformanceTrend, TrendDirection};
use sha2::{Digest, Sha256};

/// 결정적 인사이트 ID
///
/// 같은 (유형, 대상, 생성 윈도우)는 항상 같은 ID가 된다. 윈도우는
/// `generated_at`을 `window_hours` 단위로 내림한 시각이다.
pub fn insight_id(
    insight_type: InsightType,
    subject: &str,
    generated_at: DateTime<Utc>,
    window_hours: i64,
) -> String {
    let window_secs = window_hours.max(1) * 3_600;
    let window_start = generated_at.timestamp().div_euclid(window_secs) * window_secs;

    let mut hasher = Sha256::new();
    hasher.update(insight_type.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(subject.as_bytes());
    hasher.update(b"|");
    hasher.update(window_start.to_string().as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    format!("{}-{}", insight_type.as_str(), &digest[..16])
}

/// 인사이트 점수화기
#[derive(Debug, Clone)]
pub struct InsightScorer<'a> {
    policy: &'a InsightPolicy,
    /// 용량 인사이트를 만드는 소진 기한 (일)
    capacity_horizon_days: i64,
}

impl<'a> InsightScorer<'a> {
    pub fn new(policy: &'a InsightPolicy, capacity_horizon_days: i64) -> Self {
        Self {
            policy,
            capacity_horizon_days,
        }
    }

    /// 발견 사항 전체를 순위가 매겨진 인사이트 목록으로 변환
    pub fn score(&self, findings: &Findings, now: DateTime<Utc>) -> Vec<Insight> {
        let mut insights = Vec::new();

        insights.extend(self.anomaly_insights(&findings.anomalies, now));
        insights.extend(
            findings
                .capacity
                .iter()
                .filter_map(|p| self.capacity_insight(p, now)),
        );
        insights.extend(
            findings
                .disks
                .iter()
                .filter_map(|d| self.disk_insight(d, now)),
        );
        insights.extend(
            findings
                .trends
                .iter()
                .filter_map(|t| self.trend_insight(t, now)),
        );
        insights.extend(findings.costs.iter().map(|c| self.cost_insight(c, now)));

        rank(insights)
    }

    /// 메트릭별로 이상 발견 사항을 묶어 하나의 인사이트로
    fn anomaly_insights(&self, anomalies: &[AnomalyFinding], now: DateTime<Utc>) -> Vec<Insight> {
        let mut by_metric: BTreeMap<&str, Vec<&AnomalyFinding>> = BTreeMap::new();
        for finding in anomalies {
            by_metric.entry(&finding.metric).or_default().push(finding);
        }

        by_metric
            .into_iter()
            .filter_map(|(metric, group)| {
                let severity = group.iter().map(|f| f.severity).max()?;
                let title = match group.as_slice() {
                    [single] => format!("{} {}", single.kind.as_str(), single.subject()),
                    many => format!("{} anomalies in {metric}", many.len()),
                };
                let summary = group
                    .iter()
                    .map(|f| f.description.as_str())
                    .collect::<Vec<_>>()
                    .join("; ");
                let details = group
                    .iter()
                    .map(|f| {
                        format!(
                            "{}: current {:.2}, expected {:.2}, deviation {:.1}%, z-score {:.2}",
                            f.subject(),
                            f.current_value,
                            f.expected_value,
                            f.deviation_percent,
                            f.z_score
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                let actions = dedup_actions(group.iter().map(|f| f.recommendation.clone()));

                Some(self.build(
                    InsightType::Anomaly,
                    metric,
                    title,
                    summary,
                    details,
                    severity.into(),
                    actions,
                    now,
                ))
            })
            .collect()
    }

    fn capacity_insight(
        &self,
        prediction: &CapacityPrediction,
        now: DateTime<Utc>,
    ) -> Option<Insight> {
        if !prediction.is_near_term(self.capacity_horizon_days) {
            return None;
        }
        let days = prediction.days_until_full?;
        let severity = if days <= self.policy.capacity_critical_days {
            InsightSeverity::Critical
        } else if days <= self.policy.capacity_high_days {
            InsightSeverity::High
        } else {
            InsightSeverity::Medium
        };

        Some(self.build(
            InsightType::Capacity,
            &prediction.resource,
            format!("{} full in {days} days", prediction.resource),
            format!(
                "{} is at {:.1}% and growing {:.2} per day",
                prediction.resource,
                prediction.current_usage_percent,
                prediction.growth_rate_per_day
            ),
            format!(
                "{} (confidence {:.0}%, {} daily points)",
                prediction.trend_analysis,
                prediction.confidence * 100.0,
                prediction.data_points
            ),
            severity,
            prediction.recommendations.clone(),
            now,
        ))
    }

    fn disk_insight(&self, assessment: &DiskRiskAssessment, now: DateTime<Utc>) -> Option<Insight> {
        if assessment.failure_probability <= self.policy.disk_risk_min_probability {
            return None;
        }
        let severity = if assessment.failure_probability > self.policy.disk_critical_probability {
            InsightSeverity::Critical
        } else if assessment.failure_probability > self.policy.disk_high_probability {
            InsightSeverity::High
        } else {
            InsightSeverity::Medium
        };
        let eta = match assessment.days_until_failure {
            Some(days) => format!(", estimated {days} days to failure"),
            None => String::new(),
        };

        Some(self.build(
            InsightType::General,
            &format!("disk:{}", assessment.disk_name),
            format!("Disk {} failure risk", assessment.disk_name),
            format!(
                "Failure probability {:.0}%{eta}",
                assessment.failure_probability
            ),
            assessment.contributing_factors.join("\n"),
            severity,
            vec![assessment.recommended_action.clone()],
            now,
        ))
    }

    fn trend_insight(&self, trend: &PerformanceTrend, now: DateTime<Utc>) -> Option<Insight> {
        let severity = match trend.trend {
            TrendDirection::Degrading => InsightSeverity::Medium,
            TrendDirection::Volatile => InsightSeverity::Low,
            TrendDirection::Improving | TrendDirection::Stable => return None,
        };
        let subject = subject_key(&trend.metric, trend.dimension.as_deref());

        Some(self.build(
            InsightType::Performance,
            &subject,
            format!("{subject} is {}", trend.trend.as_str()),
            trend.analysis.clone(),
            format!(
                "average {:.2}, min {:.2}, max {:.2}, std deviation {:.2}, change {:+.1}% over {} days",
                trend.average,
                trend.min,
                trend.max,
                trend.std_deviation,
                trend.change_percent,
                trend.period_days
            ),
            severity,
            trend.recommendations.clone(),
            now,
        ))
    }

    fn cost_insight(&self, opportunity: &CostOpportunity, now: DateTime<Utc>) -> Insight {
        self.build(
            InsightType::Cost,
            opportunity.category.as_str(),
            opportunity.title.clone(),
            format!(
                "{} (about ${:.2}/month)",
                opportunity.description, opportunity.potential_savings_usd
            ),
            format!("difficulty: {:?}", opportunity.difficulty).to_lowercase(),
            InsightSeverity::Info,
            opportunity.implementation_steps.clone(),
            now,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        &self,
        insight_type: InsightType,
        subject: &str,
        title: String,
        summary: String,
        details: String,
        severity: InsightSeverity,
        actions: Vec<String>,
        now: DateTime<Utc>,
    ) -> Insight {
        Insight {
            id: insight_id(insight_type, subject, now, self.policy.id_window_hours),
            insight_type,
            title,
            summary,
            details,
            severity,
            actionable: !actions.is_empty(),
            actions,
            generated_at: now,
            expires_at: Some(now + self.ttl(insight_type)),
        }
    }

    fn ttl(&self, insight_type: InsightType) -> Duration {
        let hours = match insight_type {
            InsightType::Anomaly => self.policy.anomaly_ttl_hours,
            InsightType::Capacity => self.policy.capacity_ttl_hours,
            InsightType::Performance => self.policy.performance_ttl_hours,
            InsightType::Cost => self.policy.cost_ttl_hours,
            InsightType::General => self.policy.general_ttl_hours,
        };
        Duration::hours(hours)
    }
}

/// 심각도 내림차순, 유형, 제목 순으로 정렬하고 ID 중복 제거
///
/// 같은 ID가 여러 번 나오면 심각도가 높은 쪽을 남긴다.
pub fn rank(insights: Vec<Insight>) -> Vec<Insight> {
    let mut by_id: BTreeMap<String, Insight> = BTreeMap::new();
    for insight in insights {
        match by_id.get(&insight.id) {
            Some(existing) if existing.severity >= insight.severity => {}
            _ => {
                by_id.insert(insight.id.clone(), insight);
            }
        }
    }

    let mut ranked: Vec<Insight> = by_id.into_values().collect();
    ranked.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.insight_type.cmp(&b.insight_type))
            .then_with(|| a.title.cmp(&b.title))
    });
    ranked
}

fn dedup_actions(actions: impl Iterator<Item = String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for action in actions {
        if !action.is_empty() && !unique.contains(&action) {
            unique.push(action);
        }
    }
    unique
}

/// 요약기가 없거나 실패했을 때 쓰는 결정적 요약 텍스트
pub fn default_narrative(insights: &[Insight], failures: &[AnalyzerFailure]) -> String {
    let mut text = if insights.is_empty() {
        "No actionable insights this cycle; all tracked metrics look normal.".to_string()
    } else {
        let mut counts: BTreeMap<InsightSeverity, usize> = BTreeMap::new();
        for insight in insights {
            *counts.entry(insight.severity).or_default() += 1;
        }
        let breakdown = counts
            .iter()
            .rev()
            .map(|(severity, count)| format!("{count} {}", severity.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{} insight(s) ({breakdown}). Top priority: {}.",
            insights.len(),
            insights[0].title
        )
    };

    if !failures.is_empty() {
        let failed = failures
            .iter()
            .map(|f| match &f.subject {
                Some(subject) => format!("{} ({subject})", f.analyzer.as_str()),
                None => f.analyzer.as_str().to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        text.push_str(&format!(" Incomplete analysis: {failed}."));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use labsight_core::models::anomaly::{AnomalyKind, AnomalySeverity};
    use labsight_core::models::cost::{CostCategory, Difficulty};
    use labsight_core::models::findings::AnalyzerKind;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 10, 9, 30, 0).unwrap()
    }

    fn anomaly(metric: &str, dim: Option<&str>, severity: AnomalySeverity) -> AnomalyFinding {
        AnomalyFinding {
            metric: metric.to_string(),
            dimension: dim.map(str::to_string),
            kind: AnomalyKind::Spike,
            severity,
            current_value: 95.0,
            expected_value: 30.0,
            deviation_percent: 216.7,
            z_score: 3.4,
            description: format!("{metric} spiked"),
            recommendation: "Investigate CPU-heavy processes and containers".to_string(),
            detected_at: now(),
        }
    }

    fn capacity(days: Option<i64>) -> CapacityPrediction {
        CapacityPrediction {
            resource: "storage[tank]".to_string(),
            current_usage: 89.0,
            current_usage_percent: 89.0,
            growth_rate_per_day: 1.0,
            predicted_full_date: days.map(|d| now() + Duration::days(d)),
            days_until_full: days,
            confidence: 0.9,
            recommendations: vec!["Delete old snapshots and unused datasets".to_string()],
            trend_analysis: "growing".to_string(),
            data_points: 30,
            generated_at: now(),
        }
    }

    fn disk(probability: f64) -> DiskRiskAssessment {
        DiskRiskAssessment {
            disk_name: "sda".to_string(),
            failure_probability: probability,
            days_until_failure: Some(30),
            confidence: 80.0,
            contributing_factors: vec!["12 reallocated sectors (stable)".to_string()],
            recommended_action: "Order a replacement drive".to_string(),
            data_points: 24,
            assessed_at: now(),
        }
    }

    #[test]
    fn ids_are_stable_within_window() {
        let a = insight_id(InsightType::Capacity, "storage", now(), 24);
        let b = insight_id(InsightType::Capacity, "storage", now() + Duration::hours(2), 24);
        let c = insight_id(InsightType::Capacity, "storage", now() + Duration::days(1), 24);
        let d = insight_id(InsightType::Anomaly, "storage", now(), 24);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert!(a.starts_with("capacity-"));
    }

    #[test]
    fn anomalies_grouped_per_metric_with_max_severity() {
        let policy = InsightPolicy::default();
        let scorer = InsightScorer::new(&policy, 90);
        let findings = Findings {
            anomalies: vec![
                anomaly("container_cpu_percent", Some("plex"), AnomalySeverity::Medium),
                anomaly("container_cpu_percent", Some("sonarr"), AnomalySeverity::High),
                anomaly("cpu_percent", None, AnomalySeverity::Medium),
            ],
            ..Default::default()
        };

        let insights = scorer.score(&findings, now());
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].severity, InsightSeverity::High);
        assert_eq!(insights[0].title, "2 anomalies in container_cpu_percent");
        // 같은 권장 조치는 한 번만
        assert_eq!(insights[0].actions.len(), 1);
        assert!(insights[0].actionable);
        assert_eq!(insights[1].title, "spike cpu_percent");
        assert_eq!(insights[0].expires_at, Some(now() + Duration::hours(24)));
    }

    #[test]
    fn capacity_only_when_near_term() {
        let policy = InsightPolicy::default();
        let scorer = InsightScorer::new(&policy, 90);

        let cases = [
            (Some(5), Some(InsightSeverity::Critical)),
            (Some(11), Some(InsightSeverity::High)),
            (Some(60), Some(InsightSeverity::Medium)),
            (Some(120), None),
            (None, None),
        ];
        for (days, expected) in cases {
            let findings = Findings {
                capacity: vec![capacity(days)],
                ..Default::default()
            };
            let insights = scorer.score(&findings, now());
            assert_eq!(insights.first().map(|i| i.severity), expected, "days={days:?}");
        }
    }

    #[test]
    fn disk_risk_maps_to_general_insight() {
        let policy = InsightPolicy::default();
        let scorer = InsightScorer::new(&policy, 90);

        let findings = Findings {
            disks: vec![disk(80.0)],
            ..Default::default()
        };
        let insights = scorer.score(&findings, now());
        assert_eq!(insights[0].insight_type, InsightType::General);
        assert_eq!(insights[0].severity, InsightSeverity::Critical);
        assert_eq!(insights[0].actions, vec!["Order a replacement drive".to_string()]);
        assert_eq!(insights[0].expires_at, Some(now() + Duration::hours(168)));

        let quiet = Findings {
            disks: vec![disk(20.0)],
            ..Default::default()
        };
        assert!(scorer.score(&quiet, now()).is_empty());
    }

    #[test]
    fn ranking_orders_by_severity_then_type() {
        let policy = InsightPolicy::default();
        let scorer = InsightScorer::new(&policy, 90);
        let findings = Findings {
            anomalies: vec![anomaly("cpu_percent", None, AnomalySeverity::Medium)],
            capacity: vec![capacity(Some(3))],
            disks: vec![disk(50.0)],
            costs: vec![CostOpportunity {
                category: CostCategory::IdleResources,
                title: "Stop 2 idle container(s)".to_string(),
                description: "idle".to_string(),
                potential_savings_usd: 1.0,
                difficulty: Difficulty::Easy,
                implementation_steps: vec!["Stop them".to_string()],
            }],
            ..Default::default()
        };

        let insights = scorer.score(&findings, now());
        let order: Vec<InsightType> = insights.iter().map(|i| i.insight_type).collect();
        assert_eq!(
            order,
            vec![
                InsightType::Capacity,
                InsightType::General,
                InsightType::Anomaly,
                InsightType::Cost
            ]
        );
        assert!(insights
            .windows(2)
            .all(|w| w[0].severity >= w[1].severity));
    }

    #[test]
    fn rank_keeps_most_severe_duplicate() {
        let policy = InsightPolicy::default();
        let scorer = InsightScorer::new(&policy, 90);
        let findings = Findings {
            anomalies: vec![anomaly("cpu_percent", None, AnomalySeverity::Medium)],
            ..Default::default()
        };
        let mut insights = scorer.score(&findings, now());
        let mut louder = insights[0].clone();
        louder.severity = InsightSeverity::Critical;
        insights.push(louder);

        let ranked = rank(insights);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].severity, InsightSeverity::Critical);
    }

    #[test]
    fn scoring_is_deterministic() {
        let policy = InsightPolicy::default();
        let scorer = InsightScorer::new(&policy, 90);
        let findings = Findings {
            anomalies: vec![anomaly("cpu_percent", None, AnomalySeverity::High)],
            capacity: vec![capacity(Some(20))],
            ..Default::default()
        };
        assert_eq!(scorer.score(&findings, now()), scorer.score(&findings, now()));
    }

    #[test]
    fn default_narrative_mentions_failures() {
        let empty = default_narrative(&[], &[]);
        assert!(empty.starts_with("No actionable insights"));

        let policy = InsightPolicy::default();
        let scorer = InsightScorer::new(&policy, 90);
        let insights = scorer.score(
            &Findings {
                capacity: vec![capacity(Some(5))],
                ..Default::default()
            },
            now(),
        );
        let failures = vec![AnalyzerFailure {
            analyzer: AnalyzerKind::DiskFailure,
            subject: Some("sdb".to_string()),
            error: "저장소 에러: locked".to_string(),
        }];
        let text = default_narrative(&insights, &failures);
        assert!(text.contains("1 critical"));
        assert!(text.contains("storage[tank] full in 5 days"));
        assert!(text.contains("disk_failure (sdb)"));
    }
}
