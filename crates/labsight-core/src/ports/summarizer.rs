//! 요약기 포트 (선택).
//!
//! 구조화된 발견 사항을 사람이 읽을 수 있는 서술로 바꾼다.
//! 엔진은 요약기가 없거나 실패해도 정상 동작해야 하므로,
//! 호출자는 항상 타임아웃과 기본 텍스트 대체를 적용한다.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::findings::Findings;

/// 발견 사항 요약기 — 구현체: `RemoteSummarizer` (Ollama / OpenAI 호환 API)
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// 가벼운 가용성 확인 (짧은 타임아웃)
    async fn is_available(&self) -> bool;

    /// 발견 사항 요약 — 실패/타임아웃 가능
    async fn summarize(&self, findings: &Findings) -> Result<String, CoreError>;

    /// 제공자 이름 (예: "ollama:llama3.1")
    fn provider_name(&self) -> &str;
}
