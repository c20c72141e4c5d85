//! # labsight-storage
//!
//! 로컬 저장소 어댑터.
//! SQLite 기반 메트릭 샘플 저장, 분석 히스토리, 인사이트 저장,
//! 스키마 마이그레이션과 보존 정책을 관리한다.
//!
//! ## 모듈
//! - `sqlite`: `MetricsReader` + `InsightsStore` 포트 구현
//! - `migration`: 스키마 마이그레이션

pub mod migration;
pub mod sqlite;
