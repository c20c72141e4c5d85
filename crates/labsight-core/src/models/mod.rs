//! labsight 도메인 모델.
//!
//! 분석기 입력(샘플)과 출력(발견 사항, 예측, 인사이트)을 정의한다.
//! 모든 모델은 `serde` Serialize/Deserialize를 구현한다.

pub mod anomaly;
pub mod capacity;
pub mod cost;
pub mod disk;
pub mod findings;
pub mod insight;
pub mod metric;
pub mod trend;
