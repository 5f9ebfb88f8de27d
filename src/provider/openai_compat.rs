// src/provider/openai_compat.rs — OpenAI-compatible chat completions provider
//
// Works against any `/chat/completions` endpoint (DashScope compatible mode,
// OpenAI, Groq, local gateways). The model catalog comes from configuration
// rather than probing.

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, Message, ModelInfo, ModelProvider, StopReason, TokenUsage};
use crate::infra::errors::ProposerError;

pub struct OpenAICompatProvider {
    id_str: String,
    api_key: String,
    base_url: String,
    catalog: Vec<String>,
    client: reqwest::Client,
}

impl OpenAICompatProvider {
    pub fn new(
        id: impl Into<String>,
        api_key: String,
        base_url: impl Into<String>,
        catalog: Vec<String>,
    ) -> Self {
        Self {
            id_str: id.into(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            catalog,
            client: reqwest::Client::new(),
        }
    }

    fn provider_error(&self, message: impl Into<String>, retriable: bool) -> ProposerError {
        ProposerError::Provider {
            provider: self.id_str.clone(),
            message: message.into(),
            retriable,
        }
    }
}

/// JSON body for a chat completion call.
fn request_body(request: &ChatRequest) -> serde_json::Value {
    let system = request.system.as_deref().map(Message::system);
    let messages: Vec<serde_json::Value> = system
        .iter()
        .chain(&request.messages)
        .map(|m| {
            serde_json::json!({
                "role": m.role.as_str(),
                "content": m.content,
            })
        })
        .collect();

    let mut body = serde_json::json!({
        "model": request.model,
        "messages": messages,
    });
    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = serde_json::json!(max_tokens);
    }
    if let Some(temp) = request.temperature {
        body["temperature"] = serde_json::json!(temp);
    }
    body
}

/// Pull content, usage and stop reason out of a completion response.
fn parse_response(resp: &serde_json::Value) -> Option<ChatResponse> {
    let choice = &resp["choices"][0];
    let content = choice["message"]["content"].as_str()?.to_string();
    Some(ChatResponse {
        content,
        usage: TokenUsage {
            input_tokens: resp["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: resp["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
        },
        stop_reason: StopReason::from_finish_reason(choice["finish_reason"].as_str()),
    })
}

#[async_trait]
impl ModelProvider for OpenAICompatProvider {
    fn id(&self) -> &str {
        &self.id_str
    }

    fn name(&self) -> &str {
        "OpenAI-compatible"
    }

    fn models(&self) -> Vec<ModelInfo> {
        self.catalog.iter().map(ModelInfo::new).collect()
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProposerError> {
        let body = request_body(&request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header(
                "User-Agent",
                format!("proposer/{}", env!("CARGO_PKG_VERSION")),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| self.provider_error(e.to_string(), e.is_timeout() || e.is_connect()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(0);
            return Err(ProposerError::RateLimited {
                provider: self.id_str.clone(),
                retry_after_ms,
            });
        }
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(self.provider_error(
                format!("HTTP {status}: {error_body}"),
                status.is_server_error(),
            ));
        }

        let resp: serde_json::Value = response
            .json()
            .await
            .map_err(|e| self.provider_error(e.to_string(), false))?;

        let parsed = parse_response(&resp)
            .ok_or_else(|| self.provider_error("response has no message content", false))?;
        tracing::debug!(
            model = %request.model,
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            total_tokens = parsed.usage.total(),
            "chat completion"
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_puts_system_first() {
        let req = ChatRequest {
            model: "qwen-max".into(),
            messages: vec![Message::user("hello")],
            system: Some("be brief".into()),
            temperature: Some(0.7),
            max_tokens: None,
        };
        let body = request_body(&req);
        assert_eq!(body["model"], "qwen-max");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "hello");
        assert!(body.get("max_tokens").is_none());
        assert!(body["temperature"].as_f64().is_some());
    }

    #[test]
    fn test_parse_response() {
        let resp = serde_json::json!({
            "choices": [{"message": {"content": "draft"}, "finish_reason": "length"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 30}
        });
        let parsed = parse_response(&resp).unwrap();
        assert_eq!(parsed.content, "draft");
        assert_eq!(parsed.usage.total(), 42);
        assert!(matches!(parsed.stop_reason, StopReason::MaxTokens));
    }

    #[test]
    fn test_parse_response_without_content() {
        let resp = serde_json::json!({"choices": []});
        assert!(parse_response(&resp).is_none());
    }

    #[test]
    fn test_models_from_catalog() {
        let p = OpenAICompatProvider::new(
            "dashscope",
            "key".into(),
            "https://example.com/v1/",
            vec!["qwen-max".into(), "qwen-plus".into()],
        );
        let ids: Vec<String> = p.models().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["qwen-max", "qwen-plus"]);
        assert_eq!(p.base_url, "https://example.com/v1");
    }
}
