//! 비용 최적화 기회 모델.

use serde::{Deserialize, Serialize};

/// 비용 최적화 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostCategory {
    /// 유휴 컨테이너 정리
    IdleResources,
    /// 오래된 스냅샷 정리
    SnapshotCleanup,
    /// 호스트 리소스 재조정
    Rightsizing,
}

impl CostCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdleResources => "idle_resources",
            Self::SnapshotCleanup => "snapshot_cleanup",
            Self::Rightsizing => "rightsizing",
        }
    }
}

/// 구현 난이도
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// 비용 절감 기회
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostOpportunity {
    pub category: CostCategory,
    pub title: String,
    pub description: String,
    /// 월간 예상 절감액 (USD, 선형 추정)
    pub potential_savings_usd: f64,
    pub difficulty: Difficulty,
    pub implementation_steps: Vec<String>,
}

/// 비용 규칙 엔진 입력 스냅샷
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// 관찰 윈도우 동안 평균 CPU가 임계값 미만인 컨테이너
    pub idle_containers: Vec<String>,
    /// 현재 스냅샷 개수
    pub snapshot_count: Option<u64>,
    /// 최근 7일 평균 호스트 CPU 사용률 (%)
    pub avg_cpu_percent: Option<f64>,
}
