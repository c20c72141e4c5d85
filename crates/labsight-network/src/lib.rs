//! # labsight-network
//!
//! 네트워크 어댑터.
//! 분석 주기의 발견 사항을 외부 LLM(Ollama 또는 OpenAI 호환 API)에 보내
//! 사람이 읽을 서술을 받아온다. 엔진이 유일하게 호출하는 네트워크 경로다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use labsight_network::summarizer::RemoteSummarizer;
//!
//! let summarizer = RemoteSummarizer::new(&config.summarizer)?;
//! if summarizer.is_available().await {
//!     let text = summarizer.summarize(&findings).await?;
//! }
//! ```

pub mod summarizer;
