//! 디스크 SMART 샘플과 고장 위험 평가 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 히스토리가 부족할 때의 유일한 기여 요인
pub const INSUFFICIENT_DATA_FACTOR: &str = "Insufficient historical data";

/// SMART 카운터 스냅샷
///
/// 수집기가 읽지 못한 필드는 `None`으로 남는다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartSample {
    /// 수집 시각
    pub timestamp: DateTime<Utc>,
    /// 재할당 섹터 수
    pub reallocated_sectors: u64,
    /// 보류(pending) 섹터 수
    pub pending_sectors: u64,
    /// 온도 (°C)
    pub temperature_celsius: Option<f64>,
    /// 전원 인가 시간 (시간)
    pub power_on_hours: Option<u64>,
    /// SMART 전체 건강 판정 (false = FAILED)
    pub health_passed: Option<bool>,
}

impl SmartSample {
    /// 정상 디스크 샘플 (테스트/기본값용)
    pub fn healthy(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            reallocated_sectors: 0,
            pending_sectors: 0,
            temperature_celsius: None,
            power_on_hours: None,
            health_passed: Some(true),
        }
    }
}

/// 디스크 고장 위험 평가
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskRiskAssessment {
    /// 디스크 이름
    pub disk_name: String,
    /// 고장 확률 점수 (0 ~ 100)
    pub failure_probability: f64,
    /// 예상 고장까지 남은 일수
    pub days_until_failure: Option<i64>,
    /// 신뢰도 (0 ~ 100) — 경험적 휴리스틱
    pub confidence: f64,
    /// 기여 요인
    pub contributing_factors: Vec<String>,
    /// 권장 조치
    pub recommended_action: String,
    /// 평가에 사용한 샘플 수
    pub data_points: usize,
    /// 평가 시각
    pub assessed_at: DateTime<Utc>,
}

impl DiskRiskAssessment {
    /// 실제 위험 요인이 하나라도 있는지 여부
    pub fn has_risk_factors(&self) -> bool {
        !self.contributing_factors.is_empty()
            && self
                .contributing_factors
                .iter()
                .all(|f| f != INSUFFICIENT_DATA_FACTOR)
    }
}
