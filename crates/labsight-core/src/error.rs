//! labsight 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 자체 에러를 `map_err`로 `CoreError`에 매핑한다.

use thiserror::Error;

/// 코어 레이어 에러.
/// 직렬화, 설정, 저장소, 네트워크 등 도메인 공통 에러를 정의한다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 — {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 리소스를 찾을 수 없음
    #[error("{resource_type} 미발견: {id}")]
    NotFound {
        /// 리소스 종류 (예: "Insight", "Disk")
        resource_type: String,
        /// 리소스 식별자
        id: String,
    },

    /// 메트릭/인사이트 저장소 실패 (쿼리, 잠금, 마이그레이션)
    #[error("저장소 에러: {0}")]
    Storage(String),

    /// 네트워크 에러 (연결 실패, 비정상 응답)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 실행 타임아웃
    #[error("실행 타임아웃: {timeout_ms}ms 초과")]
    Timeout {
        /// 초과된 타임아웃 시간 (밀리초)
        timeout_ms: u64,
    },

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = CoreError::NotFound {
            resource_type: "Insight".to_string(),
            id: "anomaly-1234".to_string(),
        };
        assert_eq!(err.to_string(), "Insight 미발견: anomaly-1234");

        let err = CoreError::Timeout { timeout_ms: 5_000 };
        assert!(err.to_string().contains("5000ms"));
    }

    #[test]
    fn serde_error_converts() {
        let parse: Result<u32, _> = serde_json::from_str("not-a-number");
        let err: CoreError = parse.unwrap_err().into();
        assert!(matches!(err, CoreError::Serialization(_)));
    }
}
