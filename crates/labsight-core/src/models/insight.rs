//! 인사이트 모델.
//!
//! 여러 원시 발견 사항에서 파생된, 순위가 매겨지고 중복 제거된
//! 만료 시각이 있는 운영자용 결과.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::anomaly::AnomalySeverity;
use super::findings::AnalyzerFailure;

/// 인사이트 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    Anomaly,
    Capacity,
    Cost,
    Performance,
    General,
}

impl InsightType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anomaly => "anomaly",
            Self::Capacity => "capacity",
            Self::Cost => "cost",
            Self::Performance => "performance",
            Self::General => "general",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "anomaly" => Some(Self::Anomaly),
            "capacity" => Some(Self::Capacity),
            "cost" => Some(Self::Cost),
            "performance" => Some(Self::Performance),
            "general" => Some(Self::General),
            _ => None,
        }
    }
}

/// 인사이트 심각도 (정보 < 낮음 < 중간 < 높음 < 치명)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightSeverity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl InsightSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Self::Info),
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    /// 정렬용 순위 (치명 = 4)
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

impl From<AnomalySeverity> for InsightSeverity {
    fn from(severity: AnomalySeverity) -> Self {
        match severity {
            AnomalySeverity::Low => Self::Low,
            AnomalySeverity::Medium => Self::Medium,
            AnomalySeverity::High => Self::High,
            AnomalySeverity::Critical => Self::Critical,
        }
    }
}

/// 운영자용 인사이트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// (유형, 대상, 생성 윈도우)에 대해 결정적인 ID
    pub id: String,
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub title: String,
    pub summary: String,
    pub details: String,
    pub severity: InsightSeverity,
    /// `actions`가 비어 있지 않으면 true
    pub actionable: bool,
    pub actions: Vec<String>,
    pub generated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Insight {
    /// 주어진 시각 기준 만료 여부
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires) if expires <= now)
    }
}

/// 요약 텍스트 출처
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeSource {
    /// 결정적 기본 텍스트
    Default,
    /// 외부 요약기 생성
    Summarizer,
}

/// `generate()` 결과 — 계산 가능한 만큼의 인사이트와 실패한 분석기 목록
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub generated_at: DateTime<Utc>,
    /// 심각도 내림차순으로 정렬된 인사이트
    pub insights: Vec<Insight>,
    pub narrative: String,
    pub narrative_source: NarrativeSource,
    pub failures: Vec<AnalyzerFailure>,
}

impl InsightReport {
    /// 모든 분석기가 성공했는지 여부
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
