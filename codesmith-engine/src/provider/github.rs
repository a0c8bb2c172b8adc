//! GitHub Models provider implementation

use super::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Provider for the hosted GitHub Models chat-completions endpoint
pub struct GitHubModelsProvider {
    client: Client,
    config: ProviderConfig,
}

impl GitHubModelsProvider {
    pub fn new(config: ProviderConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// Provider with the default configuration (token from the environment)
    pub fn from_env() -> Self {
        Self::new(ProviderConfig::github_models())
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

impl LlmProvider for GitHubModelsProvider {
    fn name(&self) -> &str {
        "github-models"
    }

    fn models(&self) -> Vec<String> {
        vec![
            "deepseek-r1".into(),
            "gpt-4o".into(),
            "gpt-4o-mini".into(),
            "mistral-large".into(),
            "Llama-3.3-70B-Instruct".into(),
        ]
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        // The token gate runs before any network I/O
        let api_key = match self.config.api_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => return Err(ProviderError::MissingToken),
        };

        let model = request.model.as_deref().unwrap_or(self.default_model());
        let temperature = request.temperature.unwrap_or(self.config.temperature);

        let api_request = WireRequest {
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role,
                    content: m.content.clone(),
                })
                .collect(),
            model: model.to_string(),
            temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .header("content-type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let text = response.text().await.unwrap_or_default();

            if status == 429 {
                return Err(ProviderError::RateLimited { retry_after });
            } else if status == 401 || status == 403 {
                return Err(ProviderError::AuthenticationFailed);
            }

            return Err(ProviderError::Api { status, message: text });
        }

        let api_response: WireResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content);

        let usage = api_response
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: api_response.id.unwrap_or_default(),
            model: api_response.model.unwrap_or_else(|| model.to_string()),
            content,
            usage,
        })
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct WireRequest {
    messages: Vec<WireMessage>,
    model: String,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: Role,
    content: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireReply,
}

#[derive(Debug, Deserialize)]
struct WireReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
    #[serde(default)]
    total_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_config() -> ProviderConfig {
        ProviderConfig::github_models().without_api_key()
    }

    #[tokio::test]
    async fn test_missing_token_short_circuits() {
        // Endpoint is unreachable on purpose; the gate must fire first
        let config = offline_config().with_endpoint("http://127.0.0.1:1");
        let provider = GitHubModelsProvider::new(config);

        let request = CompletionRequest::staged("system", "user");
        let err = provider.complete(request).await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingToken));
    }

    #[tokio::test]
    async fn test_empty_token_counts_as_missing() {
        let config = offline_config().with_api_key("");
        let provider = GitHubModelsProvider::new(config);

        let err = provider.prompt("hello").await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingToken));
    }

    #[test]
    fn test_wire_response_parsing() {
        let raw = r#"{
            "id": "cmpl-1",
            "model": "gpt-4o",
            "choices": [{"message": {"role": "assistant", "content": "print(\"hello\")"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
        }"#;

        let parsed: WireResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.id.as_deref(), Some("cmpl-1"));
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("print(\"hello\")")
        );
        assert_eq!(parsed.usage.as_ref().unwrap().total_tokens, 17);
    }

    #[test]
    fn test_wire_response_tolerates_missing_fields() {
        let parsed: WireResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.choices.is_empty());
        assert!(parsed.usage.is_none());
    }

    #[test]
    fn test_wire_request_shape() {
        let req = WireRequest {
            messages: vec![
                WireMessage { role: Role::System, content: "s".into() },
                WireMessage { role: Role::User, content: "u".into() },
            ],
            model: "deepseek-r1".into(),
            temperature: 0.1,
            max_tokens: None,
        };

        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["model"], "deepseek-r1");
        assert!(value.get("max_tokens").is_none());
    }
}
