//! 용량 소진 예측 모델.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 일 단위로 집계된 사용량 포인트
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsagePoint {
    /// 집계 날짜 (UTC)
    pub day: NaiveDate,
    /// 평균 사용량
    pub used: f64,
    /// 평균 전체 용량
    pub capacity: f64,
}

/// 리소스 용량 소진 예측
///
/// `days_until_full`은 증가율이 0 이하이면 항상 `None`이다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityPrediction {
    /// 리소스 이름 (예: "storage", "memory")
    pub resource: String,
    /// 현재 사용량 (마지막 집계값)
    pub current_usage: f64,
    /// 현재 사용률 (%)
    pub current_usage_percent: f64,
    /// 일일 증가량 (최소제곱 기울기)
    pub growth_rate_per_day: f64,
    /// 예상 소진 날짜
    pub predicted_full_date: Option<DateTime<Utc>>,
    /// 소진까지 남은 일수
    pub days_until_full: Option<i64>,
    /// 신뢰도 (0.0 ~ 1.0)
    pub confidence: f64,
    /// 권장 조치
    pub recommendations: Vec<String>,
    /// 추세 설명
    pub trend_analysis: String,
    /// 사용한 일별 포인트 수
    pub data_points: usize,
    /// 생성 시각
    pub generated_at: DateTime<Utc>,
}

impl CapacityPrediction {
    /// 권장 조치 기간 안에 소진이 예상되는지 여부
    pub fn is_near_term(&self, horizon_days: i64) -> bool {
        matches!(self.days_until_full, Some(days) if days < horizon_days)
    }
}
