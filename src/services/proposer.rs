use std::time::{Duration as StdDuration, Instant};

use reqwest::StatusCode;
use serde_json::{json, Value as JsonValue};
use tokio::time::sleep;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult, ProposerErrorCode};
use crate::services::prompt_templates::{
    block_proposal_system_prompt, duration_estimation_system_prompt,
};

/// External generative proposer. The pipeline treats every reply as
/// untrusted text; implementations only transport it.
#[async_trait::async_trait]
pub trait BlockProposer: Send + Sync {
    /// Ask for a block proposal; returns the raw reply text.
    async fn propose_blocks(&self, payload: &JsonValue) -> AppResult<String>;

    /// Ask for a duration estimate; returns the raw reply text.
    async fn estimate_duration(&self, payload: &JsonValue) -> AppResult<String>;
}

#[derive(Debug, Clone)]
pub struct ProposerConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub http_timeout: StdDuration,
}

impl ProposerConfig {
    pub fn from_env() -> Self {
        let api_key = std::env::var("TIMEGRID_PROPOSER_API_KEY")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let base_url = std::env::var("TIMEGRID_PROPOSER_BASE_URL")
            .ok()
            .unwrap_or_else(|| "https://api.deepseek.com".to_string());
        let model = std::env::var("TIMEGRID_PROPOSER_MODEL")
            .ok()
            .unwrap_or_else(|| "deepseek-chat".to_string());

        Self {
            api_key,
            base_url,
            model,
            http_timeout: StdDuration::from_secs(60),
        }
    }

    /// Absence of an API key is not an error: the pipeline simply runs
    /// without a proposer.
    pub fn build(&self) -> AppResult<Option<LlmProposer>> {
        match &self.api_key {
            Some(api_key) => Ok(Some(LlmProposer::try_new(self, api_key.clone())?)),
            None => Ok(None),
        }
    }
}

#[derive(Clone, Copy)]
enum ProposerOperation {
    ProposeBlocks,
    EstimateDuration,
}

impl ProposerOperation {
    fn as_str(self) -> &'static str {
        match self {
            ProposerOperation::ProposeBlocks => "proposeBlocks",
            ProposerOperation::EstimateDuration => "estimateDuration",
        }
    }

    fn system_prompt(self) -> &'static str {
        match self {
            ProposerOperation::ProposeBlocks => block_proposal_system_prompt(),
            ProposerOperation::EstimateDuration => duration_estimation_system_prompt(),
        }
    }

    fn temperature(self) -> f32 {
        match self {
            ProposerOperation::ProposeBlocks => 0.3,
            ProposerOperation::EstimateDuration => 0.2,
        }
    }
}

/// Chat-completion backed proposer.
pub struct LlmProposer {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl LlmProposer {
    fn try_new(config: &ProposerConfig, api_key: String) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Some(StdDuration::from_secs(90)))
            .build()
            .map_err(|err| AppError::other(format!("failed to build proposer HTTP client: {err}")))?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let endpoint = format!("{base_url}/v1/chat/completions");

        Ok(Self {
            client,
            api_key,
            endpoint,
            model: config.model.clone(),
        })
    }

    async fn invoke_chat(
        &self,
        operation: ProposerOperation,
        payload: &JsonValue,
    ) -> AppResult<String> {
        let correlation_id = Uuid::new_v4().to_string();
        let request_body = self.build_request_body(operation, payload);
        let backoff_schedule = [
            StdDuration::from_secs(0),
            StdDuration::from_secs(1),
            StdDuration::from_secs(2),
            StdDuration::from_secs(4),
        ];

        let mut last_error: Option<AppError> = None;

        for (attempt, delay) in backoff_schedule.iter().enumerate() {
            if *delay > StdDuration::from_secs(0) {
                sleep(*delay).await;
            }

            debug!(
                target: "timegrid::proposer",
                operation = operation.as_str(),
                attempt = attempt + 1,
                correlation_id = %correlation_id,
                "invoking proposer"
            );

            let start = Instant::now();
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&request_body)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let latency_ms = start.elapsed().as_millis();
                        debug!(
                            target: "timegrid::proposer",
                            correlation_id = %correlation_id,
                            latency_ms,
                            "proposer responded"
                        );

                        let body: JsonValue = resp.json().await.map_err(|err| {
                            AppError::proposer_with_details(
                                ProposerErrorCode::InvalidResponse,
                                "failed to parse proposer response body",
                                Some(correlation_id.as_str()),
                                Some(json!({ "reason": err.to_string() })),
                            )
                        })?;

                        let content = body
                            .pointer("/choices/0/message/content")
                            .and_then(|value| value.as_str())
                            .ok_or_else(|| {
                                AppError::proposer_with_details(
                                    ProposerErrorCode::InvalidResponse,
                                    "proposer response missing message.content",
                                    Some(correlation_id.as_str()),
                                    Some(json!({ "reason": "missing_message_content" })),
                                )
                            })?;

                        return Ok(Self::strip_code_fences(content));
                    }

                    let (error, retryable) = Self::map_http_error(status, correlation_id.as_str());
                    warn!(
                        target: "timegrid::proposer",
                        correlation_id = %correlation_id,
                        status = status.as_u16(),
                        retryable,
                        "proposer returned non-success status"
                    );

                    if !retryable || attempt == backoff_schedule.len() - 1 {
                        return Err(error);
                    }
                    last_error = Some(error);
                }
                Err(err) => {
                    let (error, retryable) = Self::error_from_reqwest(err, correlation_id.as_str());
                    warn!(
                        target: "timegrid::proposer",
                        correlation_id = %correlation_id,
                        retryable,
                        "proposer request failed"
                    );

                    if !retryable || attempt == backoff_schedule.len() - 1 {
                        return Err(error);
                    }
                    last_error = Some(error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AppError::proposer_with_details(
                ProposerErrorCode::ProviderUnavailable,
                "proposer request failed",
                Some(correlation_id.as_str()),
                None,
            )
        }))
    }

    fn build_request_body(&self, operation: ProposerOperation, payload: &JsonValue) -> JsonValue {
        let user_content = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
        json!({
            "model": self.model,
            "temperature": operation.temperature(),
            "top_p": 0.9,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": operation.system_prompt() },
                { "role": "user", "content": user_content }
            ]
        })
    }

    /// Replies sometimes arrive wrapped in markdown fences despite the
    /// prompt; strip them before the caller's own recovery step.
    fn strip_code_fences(content: &str) -> String {
        let trimmed = content.trim();
        if trimmed.starts_with("```") {
            trimmed
                .trim_start_matches("```json")
                .trim_start_matches("```JSON")
                .trim_start_matches("```")
                .trim_end_matches("```")
                .trim()
                .to_string()
        } else {
            trimmed.to_string()
        }
    }

    fn map_http_error(status: StatusCode, correlation_id: &str) -> (AppError, bool) {
        match status {
            StatusCode::UNAUTHORIZED => (
                AppError::proposer_with_details(
                    ProposerErrorCode::MissingApiKey,
                    "proposer API key invalid or unauthorized",
                    Some(correlation_id),
                    None,
                ),
                false,
            ),
            StatusCode::FORBIDDEN => (
                AppError::proposer_with_details(
                    ProposerErrorCode::Forbidden,
                    "proposer API access forbidden",
                    Some(correlation_id),
                    None,
                ),
                false,
            ),
            StatusCode::TOO_MANY_REQUESTS => (
                AppError::proposer_with_details(
                    ProposerErrorCode::RateLimited,
                    "proposer rate limit exceeded",
                    Some(correlation_id),
                    None,
                ),
                true,
            ),
            status if status.is_server_error() => (
                AppError::proposer_with_details(
                    ProposerErrorCode::ProviderUnavailable,
                    format!("proposer temporarily unavailable (status {})", status.as_u16()),
                    Some(correlation_id),
                    None,
                ),
                true,
            ),
            StatusCode::BAD_REQUEST => (
                AppError::proposer_with_details(
                    ProposerErrorCode::InvalidRequest,
                    "proposer rejected the request payload",
                    Some(correlation_id),
                    None,
                ),
                false,
            ),
            StatusCode::NOT_FOUND => (
                AppError::proposer_with_details(
                    ProposerErrorCode::InvalidRequest,
                    "proposer endpoint not found",
                    Some(correlation_id),
                    None,
                ),
                false,
            ),
            status => (
                AppError::proposer_with_details(
                    ProposerErrorCode::Unknown,
                    format!("proposer returned status {}", status.as_u16()),
                    Some(correlation_id),
                    None,
                ),
                false,
            ),
        }
    }

    fn error_from_reqwest(err: reqwest::Error, correlation_id: &str) -> (AppError, bool) {
        if err.is_timeout() {
            (
                AppError::proposer_with_details(
                    ProposerErrorCode::HttpTimeout,
                    "proposer request timed out",
                    Some(correlation_id),
                    None,
                ),
                true,
            )
        } else if err.is_connect() {
            (
                AppError::proposer_with_details(
                    ProposerErrorCode::ProviderUnavailable,
                    "proposer connection failed",
                    Some(correlation_id),
                    None,
                ),
                true,
            )
        } else if let Some(status) = err.status() {
            Self::map_http_error(status, correlation_id)
        } else {
            (
                AppError::proposer_with_details(
                    ProposerErrorCode::Unknown,
                    format!("proposer request failed: {err}"),
                    Some(correlation_id),
                    None,
                ),
                false,
            )
        }
    }
}

#[async_trait::async_trait]
impl BlockProposer for LlmProposer {
    async fn propose_blocks(&self, payload: &JsonValue) -> AppResult<String> {
        self.invoke_chat(ProposerOperation::ProposeBlocks, payload)
            .await
    }

    async fn estimate_duration(&self, payload: &JsonValue) -> AppResult<String> {
        self.invoke_chat(ProposerOperation::EstimateDuration, payload)
            .await
    }
}

pub mod testing {
    use super::*;

    /// Expose the status mapping for integration tests without widening
    /// the public API surface.
    pub fn map_http_error(status: StatusCode) -> (AppError, bool) {
        LlmProposer::map_http_error(status, "test-correlation-id")
    }

    /// Build a proposer pointed at a local mock server.
    pub fn proposer_with_base_url(base_url: &str, timeout: StdDuration) -> AppResult<LlmProposer> {
        let config = ProposerConfig {
            api_key: Some("test-key".to_string()),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: "deepseek-chat".to_string(),
            http_timeout: timeout,
        };
        LlmProposer::try_new(&config, "test-key".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_fences_are_stripped() {
        let fenced = "```json\n{\"proposed_blocks\": []}\n```";
        assert_eq!(
            LlmProposer::strip_code_fences(fenced),
            "{\"proposed_blocks\": []}"
        );
        assert_eq!(LlmProposer::strip_code_fences("plain"), "plain");
    }

    #[test]
    fn env_config_defaults_apply_without_overrides() {
        let config = ProposerConfig {
            api_key: None,
            base_url: "https://api.deepseek.com".to_string(),
            model: "deepseek-chat".to_string(),
            http_timeout: StdDuration::from_secs(60),
        };
        assert!(config.build().unwrap().is_none());
    }
}
