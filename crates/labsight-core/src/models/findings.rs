//! 분석 주기 단위의 원시 발견 사항 묶음.
//!
//! 인사이트 점수화와 요약기(Summarizer) 입력에 함께 쓰인다.

use serde::{Deserialize, Serialize};

use super::anomaly::AnomalyFinding;
use super::capacity::CapacityPrediction;
use super::cost::CostOpportunity;
use super::disk::DiskRiskAssessment;
use super::trend::PerformanceTrend;

/// 분석기 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    Anomaly,
    Capacity,
    DiskFailure,
    PerformanceTrend,
    Cost,
}

impl AnalyzerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anomaly => "anomaly",
            Self::Capacity => "capacity",
            Self::DiskFailure => "disk_failure",
            Self::PerformanceTrend => "performance_trend",
            Self::Cost => "cost",
        }
    }
}

/// 분석기 단위 실패 기록 (저장소 조회 실패 등)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerFailure {
    pub analyzer: AnalyzerKind,
    /// 실패한 대상 (메트릭/디스크/리소스), 분석기 전체 실패면 `None`
    pub subject: Option<String>,
    pub error: String,
}

/// 한 주기에서 수집된 원시 발견 사항
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Findings {
    pub anomalies: Vec<AnomalyFinding>,
    pub capacity: Vec<CapacityPrediction>,
    pub disks: Vec<DiskRiskAssessment>,
    pub trends: Vec<PerformanceTrend>,
    pub costs: Vec<CostOpportunity>,
}

impl Findings {
    pub fn is_empty(&self) -> bool {
        self.anomalies.is_empty()
            && self.capacity.is_empty()
            && self.disks.is_empty()
            && self.trends.is_empty()
            && self.costs.is_empty()
    }
}
