//! Model invocation with timeout, retry, and fallback substitution.
//!
//! One call to the external model endpoint per attempt. Timeout and
//! unavailability get up to two retries with exponential backoff (base 1s,
//! doubling); after that the tier's configured fallback model is tried once.
//! Exhaustion surfaces as `InvokeError::FallbackExhausted`, which the
//! orchestrator absorbs as a degraded round entry rather than aborting the
//! session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::router::tiers::{ModelTier, TierTable, DEGRADED_MODEL};

/// Typed failure taxonomy for model invocation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InvokeError {
    /// The attempt exceeded its per-call time bound.
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
    /// Connection or auth failure before a response arrived.
    #[error("model unavailable: {0}")]
    Unavailable(String),
    /// Non-2xx response with an explicit error body.
    #[error("model rejected request ({status}): {reason}")]
    Rejected { status: u16, reason: String },
    /// Primary retries and the fallback attempt all failed.
    #[error("fallback exhausted for tier {tier} after {attempts} attempts: {last_error}")]
    FallbackExhausted {
        tier: ModelTier,
        attempts: u32,
        last_error: String,
    },
    /// The session-level deadline passed; no further attempts are made.
    #[error("session deadline exceeded")]
    DeadlineExceeded,
}

impl InvokeError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Unavailable(_))
    }
}

/// A successful completion from the model endpoint.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub token_count: u32,
}

/// External model-serving capability: submit a prompt against a model id,
/// receive generated text and a token count.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(
        &self,
        model_id: &str,
        prompt: &str,
        max_output_tokens: u32,
    ) -> Result<Completion, InvokeError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionRequest<'a> {
    model_id: &'a str,
    prompt: &'a str,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletionResponse {
    text: String,
    token_count: u32,
}

/// HTTP client for the model tier endpoint.
pub struct HttpModelClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl HttpModelClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, InvokeError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(request_timeout)
            .build()
            .map_err(|e| InvokeError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            request_timeout,
        })
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn complete(
        &self,
        model_id: &str,
        prompt: &str,
        max_output_tokens: u32,
    ) -> Result<Completion, InvokeError> {
        let url = format!("{}/v1/completions", self.base_url);
        let mut request = self.client.post(&url).json(&CompletionRequest {
            model_id,
            prompt,
            max_output_tokens,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                InvokeError::Timeout(self.request_timeout)
            } else {
                InvokeError::Unavailable(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let reason = response.text().await.unwrap_or_default();
            return Err(InvokeError::Rejected { status, reason });
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| InvokeError::Unavailable(e.to_string()))?;
        Ok(Completion {
            text: body.text,
            token_count: body.token_count,
        })
    }
}

/// Output of one role invocation within a round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleOutput {
    pub text: String,
    pub token_count: u32,
    pub model_used: String,
    pub latency_ms: u64,
}

impl RoleOutput {
    /// Placeholder recorded when the fallback chain is exhausted.
    pub fn degraded() -> Self {
        Self {
            text: String::new(),
            token_count: 0,
            model_used: DEGRADED_MODEL.to_string(),
            latency_ms: 0,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.model_used == DEGRADED_MODEL
    }
}

/// Retry and timeout policy for individual model calls.
#[derive(Debug, Clone)]
pub struct InvokerConfig {
    /// Upper bound on every individual attempt, enforced locally even if
    /// the transport has no native timeout.
    pub per_call_timeout: Duration,
    /// Retries on timeout/unavailable before fallback substitution.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles per retry.
    pub backoff_base: Duration,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            per_call_timeout: Duration::from_secs(60),
            max_retries: 2,
            backoff_base: Duration::from_secs(1),
        }
    }
}

/// Performs tier-bound model calls with retries and fallback substitution.
pub struct ModelInvoker {
    client: Arc<dyn ModelClient>,
    tiers: Arc<TierTable>,
    config: InvokerConfig,
}

impl ModelInvoker {
    pub fn new(client: Arc<dyn ModelClient>, tiers: Arc<TierTable>, config: InvokerConfig) -> Self {
        Self {
            client,
            tiers,
            config,
        }
    }

    /// Invoke the tier's primary model with retries, then its fallback.
    ///
    /// `deadline` is the session-level wall-clock bound: it caps every
    /// individual attempt and stops the retry loop once passed, cancelling
    /// any in-flight attempt.
    pub async fn invoke(
        &self,
        tier: ModelTier,
        prompt: &str,
        deadline: Instant,
    ) -> Result<RoleOutput, InvokeError> {
        let cfg = self.tiers.get(tier);
        let mut attempts = 0u32;
        let mut last_error = String::new();

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = self.config.backoff_base * 2u32.pow(attempt - 1);
                if Instant::now() + backoff >= deadline {
                    return Err(InvokeError::DeadlineExceeded);
                }
                tracing::warn!(
                    tier = %tier,
                    model = %cfg.model_id,
                    attempt,
                    "retrying after {:?}",
                    backoff
                );
                tokio::time::sleep(backoff).await;
            }
            attempts += 1;
            match self
                .attempt(&cfg.model_id, prompt, cfg.max_output_tokens, deadline)
                .await
            {
                Ok(output) => return Ok(output),
                Err(InvokeError::DeadlineExceeded) => return Err(InvokeError::DeadlineExceeded),
                Err(e) if e.is_retryable() => {
                    tracing::warn!(tier = %tier, model = %cfg.model_id, error = %e, "attempt failed");
                    last_error = e.to_string();
                }
                Err(e) => {
                    // Rejected is not retryable; go straight to the fallback.
                    tracing::warn!(tier = %tier, model = %cfg.model_id, error = %e, "request rejected");
                    last_error = e.to_string();
                    break;
                }
            }
        }

        let Some(fallback_id) = cfg.fallback_model_id.as_deref() else {
            return Err(InvokeError::FallbackExhausted {
                tier,
                attempts,
                last_error,
            });
        };

        tracing::warn!(tier = %tier, fallback = fallback_id, "substituting fallback model");
        attempts += 1;
        match self
            .attempt(fallback_id, prompt, cfg.max_output_tokens, deadline)
            .await
        {
            Ok(output) => Ok(output),
            Err(InvokeError::DeadlineExceeded) => Err(InvokeError::DeadlineExceeded),
            Err(e) => Err(InvokeError::FallbackExhausted {
                tier,
                attempts,
                last_error: e.to_string(),
            }),
        }
    }

    async fn attempt(
        &self,
        model_id: &str,
        prompt: &str,
        max_output_tokens: u32,
        deadline: Instant,
    ) -> Result<RoleOutput, InvokeError> {
        let now = Instant::now();
        if now >= deadline {
            return Err(InvokeError::DeadlineExceeded);
        }
        let cap = deadline.min(now + self.config.per_call_timeout);

        match tokio::time::timeout_at(cap, self.client.complete(model_id, prompt, max_output_tokens))
            .await
        {
            Ok(Ok(completion)) => Ok(RoleOutput {
                text: completion.text,
                token_count: completion.token_count,
                model_used: model_id.to_string(),
                latency_ms: now.elapsed().as_millis() as u64,
            }),
            Ok(Err(e)) => Err(e),
            Err(_) if cap == deadline => Err(InvokeError::DeadlineExceeded),
            Err(_) => Err(InvokeError::Timeout(self.config.per_call_timeout)),
        }
    }
}
