//! 성능 추세 분류 모델.

use serde::{Deserialize, Serialize};

/// 추세 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Degrading,
    Volatile,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Stable => "stable",
            Self::Degrading => "degrading",
            Self::Volatile => "volatile",
        }
    }

    /// 조치가 필요한 분류인지 여부
    pub fn needs_attention(&self) -> bool {
        matches!(self, Self::Degrading | Self::Volatile)
    }
}

/// 메트릭의 다주간 추세
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceTrend {
    /// 메트릭 이름
    pub metric: String,
    /// 차원 (디스크/풀 이름)
    pub dimension: Option<String>,
    /// 분석 기간 (일)
    pub period_days: u32,
    /// 추세 분류
    pub trend: TrendDirection,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub std_deviation: f64,
    pub variance: f64,
    /// 첫 주 대비 최근 주 평균 변화율 (%)
    pub change_percent: f64,
    /// 분석 설명
    pub analysis: String,
    /// 권장 조치 (degrading/volatile일 때만)
    pub recommendations: Vec<String>,
}
