//! # labsight-insights
//!
//! 예측 분석 엔진.
//! 노이즈가 있는 시계열(CPU/메모리/풀 용량/SMART 카운터)을 순위가 매겨지고
//! 중복 제거된 인사이트로 변환한다.
//!
//! - [`stats`] — 평균/분산/z-score/최소제곱 기울기
//! - [`anomaly`], [`capacity`], [`disk`], [`trend`], [`cost`] — 순수 분석기
//! - [`scoring`] — 발견 사항 → 인사이트, 결정적 ID, 순위
//! - [`engine`] — 분석 주기 오케스트레이션과 단독 접근자

pub mod anomaly;
pub mod capacity;
pub mod cost;
pub mod disk;
pub mod engine;
pub mod scoring;
pub mod stats;
pub mod trend;

#[cfg(test)]
mod testing;

pub use engine::{CyclePhase, InsightEngine};
