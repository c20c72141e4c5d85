//! 규칙 기반 비용 최적화 조언.
//!
//! 절감액은 정책 단가에 대한 단순 선형 추정이다.

use labsight_core::config::CostPolicy;
use labsight_core::models::cost::{CostCategory, CostOpportunity, Difficulty, ResourceSnapshot};
use labsight_core::models::metric::{values, MetricSample};

use crate::stats;

/// 비용 최적화 조언기
#[derive(Debug, Clone)]
pub struct CostAdvisor<'a> {
    policy: &'a CostPolicy,
}

impl<'a> CostAdvisor<'a> {
    pub fn new(policy: &'a CostPolicy) -> Self {
        Self { policy }
    }

    /// 관찰 윈도우의 CPU 샘플로 컨테이너 유휴 여부 판정
    ///
    /// 샘플이 없으면 유휴로 보지 않는다 (수집 누락과 구분할 수 없음).
    pub fn is_idle(&self, cpu_samples: &[MetricSample]) -> bool {
        !cpu_samples.is_empty()
            && stats::mean(&values(cpu_samples)) < self.policy.idle_cpu_percent
    }

    /// 스냅샷에서 절감 기회 도출
    pub fn advise(&self, snapshot: &ResourceSnapshot) -> Vec<CostOpportunity> {
        let policy = self.policy;
        let mut opportunities = Vec::new();

        if !snapshot.idle_containers.is_empty() {
            let count = snapshot.idle_containers.len();
            opportunities.push(CostOpportunity {
                category: CostCategory::IdleResources,
                title: format!("Stop {count} idle container(s)"),
                description: format!(
                    "{} averaged below {:.1}% CPU over the last {} hours",
                    snapshot.idle_containers.join(", "),
                    policy.idle_cpu_percent,
                    policy.idle_window_hours
                ),
                potential_savings_usd: count as f64 * policy.idle_container_monthly_usd,
                difficulty: Difficulty::Easy,
                implementation_steps: vec![
                    format!(
                        "Confirm the containers are no longer needed: {}",
                        snapshot.idle_containers.join(", ")
                    ),
                    "Stop the containers and disable their restart policy".to_string(),
                    "Remove unused images and volumes once confirmed".to_string(),
                ],
            });
        }

        if let Some(count) = snapshot.snapshot_count {
            if count > policy.snapshot_threshold {
                let excess = count - policy.snapshot_threshold;
                opportunities.push(CostOpportunity {
                    category: CostCategory::SnapshotCleanup,
                    title: format!("Prune {excess} excess snapshot(s)"),
                    description: format!(
                        "{count} snapshots exist; the retention target is {}",
                        policy.snapshot_threshold
                    ),
                    potential_savings_usd: excess as f64 * policy.snapshot_monthly_usd,
                    difficulty: Difficulty::Easy,
                    implementation_steps: vec![
                        "List snapshots by age and size".to_string(),
                        "Delete snapshots outside the retention schedule".to_string(),
                        "Configure automatic snapshot pruning".to_string(),
                    ],
                });
            }
        }

        if let Some(avg_cpu) = snapshot.avg_cpu_percent {
            let threshold = policy.underutilized_cpu_percent;
            if threshold > 0.0 && avg_cpu < threshold {
                let savings = policy.host_monthly_usd * (threshold - avg_cpu) / threshold;
                opportunities.push(CostOpportunity {
                    category: CostCategory::Rightsizing,
                    title: "Host CPU is underutilized".to_string(),
                    description: format!(
                        "Average CPU was {avg_cpu:.1}% over the last {} days",
                        policy.cpu_window_days
                    ),
                    potential_savings_usd: savings,
                    difficulty: Difficulty::Medium,
                    implementation_steps: vec![
                        "Consolidate workloads onto fewer hosts".to_string(),
                        "Enable a power-saving CPU governor".to_string(),
                        "Power down idle hosts outside working hours".to_string(),
                    ],
                });
            }
        }

        opportunities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn idle_containers_priced_linearly() {
        let policy = CostPolicy::default();
        let advisor = CostAdvisor::new(&policy);
        let snapshot = ResourceSnapshot {
            idle_containers: vec!["a".into(), "b".into(), "c".into()],
            ..Default::default()
        };

        let opportunities = advisor.advise(&snapshot);
        assert_eq!(opportunities.len(), 1);
        assert_eq!(opportunities[0].category, CostCategory::IdleResources);
        assert!((opportunities[0].potential_savings_usd - 1.5).abs() < 1e-9);
        assert_eq!(opportunities[0].difficulty, Difficulty::Easy);
    }

    #[test]
    fn snapshots_above_threshold() {
        let policy = CostPolicy::default();
        let advisor = CostAdvisor::new(&policy);

        let under = ResourceSnapshot {
            snapshot_count: Some(50),
            ..Default::default()
        };
        assert!(advisor.advise(&under).is_empty());

        let over = ResourceSnapshot {
            snapshot_count: Some(80),
            ..Default::default()
        };
        let opportunities = advisor.advise(&over);
        assert_eq!(opportunities[0].category, CostCategory::SnapshotCleanup);
        assert!((opportunities[0].potential_savings_usd - 3.0).abs() < 1e-9);
    }

    #[test]
    fn underutilized_host() {
        let policy = CostPolicy::default();
        let advisor = CostAdvisor::new(&policy);
        let snapshot = ResourceSnapshot {
            avg_cpu_percent: Some(5.0),
            ..Default::default()
        };

        let opportunities = advisor.advise(&snapshot);
        assert_eq!(opportunities[0].category, CostCategory::Rightsizing);
        // 30 * (20 - 5) / 20
        assert!((opportunities[0].potential_savings_usd - 22.5).abs() < 1e-9);

        let busy = ResourceSnapshot {
            avg_cpu_percent: Some(45.0),
            ..Default::default()
        };
        assert!(advisor.advise(&busy).is_empty());
    }

    #[test]
    fn idle_detection_requires_samples() {
        let policy = CostPolicy::default();
        let advisor = CostAdvisor::new(&policy);
        let now = Utc::now();

        assert!(!advisor.is_idle(&[]));
        let quiet: Vec<MetricSample> = (0..5)
            .map(|i| MetricSample::new(now - Duration::hours(i), 0.2))
            .collect();
        assert!(advisor.is_idle(&quiet));
        let busy = [MetricSample::new(now, 12.0), MetricSample::new(now, 0.0)];
        assert!(!advisor.is_idle(&busy));
    }
}
