//! 외부 LLM 요약기 클라이언트.
//!
//! 분석 주기의 구조화된 발견 사항(JSON)을 프롬프트로 보내 짧은 운영자용 요약을 받는다.
//! 원시 샘플은 보내지 않고 분석기 출력만 전달한다.

use async_trait::async_trait;
use tracing::{debug, warn};

use labsight_core::config::{SummarizerConfig, SummarizerProvider};
use labsight_core::error::CoreError;
use labsight_core::models::findings::Findings;
use labsight_core::ports::summarizer::Summarizer;

/// 응답 본문 로그/에러 메시지 최대 길이
const BODY_PREVIEW_CHARS: usize = 200;

// ============================================================
// RemoteSummarizer
// ============================================================

/// 외부 LLM 요약기 — `Summarizer` 포트 구현
///
/// 지원 API:
/// - Ollama: 가용성 `GET /api/tags`, 요약 `POST /api/generate`
/// - OpenAI 호환 (llama.cpp server, vLLM 등): `GET /v1/models`, `POST /v1/chat/completions`
///
/// 가용성 확인은 `probe_timeout_ms`, 요약 요청은 `timeout_ms`로 제한된다.
#[derive(Debug)]
pub struct RemoteSummarizer {
    http_client: reqwest::Client,
    /// 끝의 `/`를 뗀 기본 URL
    base_url: String,
    model: String,
    /// OpenAI 호환 제공자만 사용 (메모리에만 유지)
    api_key: Option<String>,
    provider: SummarizerProvider,
    probe_timeout: std::time::Duration,
    /// 로그용 이름 (예: "ollama:llama3.1")
    name: String,
}

impl RemoteSummarizer {
    pub fn new(config: &SummarizerConfig) -> Result<Self, CoreError> {
        if config.endpoint.trim().is_empty() {
            return Err(CoreError::Config("요약기 endpoint 미설정".into()));
        }
        if config.model.trim().is_empty() {
            return Err(CoreError::Config("요약기 model 미설정".into()));
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 생성 실패: {e}")))?;

        let prefix = match config.provider {
            SummarizerProvider::Ollama => "ollama",
            SummarizerProvider::OpenAiCompatible => "openai",
        };
        let name = format!("{prefix}:{}", config.model);

        debug!(
            endpoint = %config.endpoint,
            provider = %name,
            timeout_ms = config.timeout_ms,
            probe_timeout_ms = config.probe_timeout_ms,
            "RemoteSummarizer 초기화"
        );

        Ok(Self {
            http_client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            provider: config.provider,
            probe_timeout: config.probe_timeout(),
            name,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn probe_path(&self) -> &'static str {
        match self.provider {
            SummarizerProvider::Ollama => "/api/tags",
            SummarizerProvider::OpenAiCompatible => "/v1/models",
        }
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {key}")),
            None => builder,
        }
    }

    fn system_prompt() -> &'static str {
        "You are an assistant for a home-lab operator. \
You receive the structured findings of one analysis cycle as JSON: anomalies, capacity \
predictions, disk risk assessments, performance trends and cost opportunities. \
Write a short plain-text summary (at most five sentences) that leads with the most urgent \
problem, names the affected resource and the concrete next step. \
Do not invent numbers that are not in the findings. If nothing needs attention, say so in one sentence."
    }

    /// 사용자 프롬프트 구성 (발견 사항 JSON 포함)
    fn build_prompt(findings: &Findings) -> Result<String, CoreError> {
        let json = serde_json::to_string_pretty(findings)?;
        Ok(format!(
            "Findings: {} anomalies, {} capacity predictions, {} disk assessments, {} trends, {} cost opportunities.\n\n{json}\n",
            findings.anomalies.len(),
            findings.capacity.len(),
            findings.disks.len(),
            findings.trends.len(),
            findings.costs.len(),
        ))
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        match self.provider {
            SummarizerProvider::Ollama => serde_json::json!({
                "model": self.model,
                "system": Self::system_prompt(),
                "prompt": prompt,
                "stream": false,
            }),
            SummarizerProvider::OpenAiCompatible => serde_json::json!({
                "model": self.model,
                "max_tokens": 512,
                "messages": [
                    { "role": "system", "content": Self::system_prompt() },
                    { "role": "user", "content": prompt }
                ]
            }),
        }
    }

    fn generate_path(&self) -> &'static str {
        match self.provider {
            SummarizerProvider::Ollama => "/api/generate",
            SummarizerProvider::OpenAiCompatible => "/v1/chat/completions",
        }
    }

    /// Ollama 응답 파싱 (`response` 필드)
    fn parse_ollama_response(body: &str) -> Result<String, CoreError> {
        let response: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| CoreError::Internal(format!("요약 응답 JSON 파싱 실패: {e}")))?;

        response
            .get("response")
            .and_then(|t| t.as_str())
            .map(|t| t.trim().to_string())
            .ok_or_else(|| CoreError::Internal("Ollama 응답에 response 필드 없음".to_string()))
    }

    /// OpenAI 호환 응답 파싱 (`choices[0].message.content`)
    fn parse_openai_response(body: &str) -> Result<String, CoreError> {
        let response: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| CoreError::Internal(format!("요약 응답 JSON 파싱 실패: {e}")))?;

        response
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(|t| t.as_str())
            .map(|t| t.trim().to_string())
            .ok_or_else(|| {
                CoreError::Internal("OpenAI 응답에서 텍스트를 찾을 수 없음".to_string())
            })
    }
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

#[async_trait]
impl Summarizer for RemoteSummarizer {
    async fn is_available(&self) -> bool {
        let request = self
            .with_auth(self.http_client.get(self.url(self.probe_path())))
            .timeout(self.probe_timeout);

        match request.send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                debug!(provider = %self.name, status = %response.status(), "요약기 가용성 확인 실패");
                false
            }
            Err(e) => {
                debug!(provider = %self.name, "요약기 연결 실패: {e}");
                false
            }
        }
    }

    async fn summarize(&self, findings: &Findings) -> Result<String, CoreError> {
        let prompt = Self::build_prompt(findings)?;

        debug!(
            provider = %self.name,
            prompt_chars = prompt.len(),
            "요약 요청"
        );

        let response = self
            .with_auth(self.http_client.post(self.url(self.generate_path())))
            .json(&self.request_body(&prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::Network(format!("요약 요청 타임아웃: {e}"))
                } else {
                    CoreError::Network(format!("요약 요청 실패: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CoreError::Network(format!("요약 응답 읽기 실패: {e}")))?;

        if !status.is_success() {
            warn!(provider = %self.name, status = %status, "요약기 오류 응답");
            return Err(CoreError::Network(format!(
                "요약기 오류 ({status}): {}",
                preview(&body)
            )));
        }

        let text = match self.provider {
            SummarizerProvider::Ollama => Self::parse_ollama_response(&body)?,
            SummarizerProvider::OpenAiCompatible => Self::parse_openai_response(&body)?,
        };

        debug!(provider = %self.name, chars = text.len(), "요약 수신");
        Ok(text)
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}

// ============================================================
// 테스트
// ============================================================
