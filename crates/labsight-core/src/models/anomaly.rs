//! 이상 탐지 결과 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metric::subject_key;

/// 이상 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// 평균 대비 급증
    Spike,
    /// 평균 대비 급감
    Drop,
    /// 추세성 이탈
    Trend,
    /// 반복 패턴 이탈
    Pattern,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spike => "spike",
            Self::Drop => "drop",
            Self::Trend => "trend",
            Self::Pattern => "pattern",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "spike" => Some(Self::Spike),
            "drop" => Some(Self::Drop),
            "trend" => Some(Self::Trend),
            "pattern" => Some(Self::Pattern),
            _ => None,
        }
    }
}

/// 이상 심각도 (낮음 < 중간 < 높음 < 치명)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AnomalySeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// 단일 메트릭의 이상 탐지 결과
///
/// 탐지 주기마다 새로 생성되어 히스토리에 추가되며, 수정되지 않는다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyFinding {
    /// 메트릭 이름
    pub metric: String,
    /// 차원 (디스크/풀/컨테이너 이름)
    pub dimension: Option<String>,
    /// 이상 유형
    pub kind: AnomalyKind,
    /// 심각도
    pub severity: AnomalySeverity,
    /// 최신 샘플 값
    pub current_value: f64,
    /// 윈도우 평균 (기대값)
    pub expected_value: f64,
    /// 평균 대비 편차 (%)
    pub deviation_percent: f64,
    /// z-score
    pub z_score: f64,
    /// 설명
    pub description: String,
    /// 권장 조치
    pub recommendation: String,
    /// 탐지 시각
    pub detected_at: DateTime<Utc>,
}

impl AnomalyFinding {
    /// `metric[dimension]` 형식의 대상 키
    pub fn subject(&self) -> String {
        subject_key(&self.metric, self.dimension.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(AnomalySeverity::Critical > AnomalySeverity::High);
        assert!(AnomalySeverity::High > AnomalySeverity::Medium);
        assert!(AnomalySeverity::Medium > AnomalySeverity::Low);
    }

    #[test]
    fn kind_string_roundtrip() {
        for kind in [
            AnomalyKind::Spike,
            AnomalyKind::Drop,
            AnomalyKind::Trend,
            AnomalyKind::Pattern,
        ] {
            assert_eq!(AnomalyKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(AnomalyKind::parse("surge"), None);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&AnomalyKind::Spike).unwrap();
        assert_eq!(json, "\"spike\"");
    }
}
