// src/provider/retry.rs — Backoff retry around a model provider
//
// Only transient provider failures are retried (rate limits and errors the
// provider marked retriable). Everything else surfaces on the first attempt.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, ModelInfo, ModelProvider};
use crate::infra::errors::ProposerError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    pub jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1_000),
            backoff_factor: 2.0,
            max_delay: Duration::from_millis(20_000),
            jitter_fraction: 0.2,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Delay before retry number `attempt` (0-indexed).
    ///
    /// A server-provided rate-limit hint replaces the exponential schedule.
    pub fn delay_for(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        if let Some(hint) = hint {
            return hint + Duration::from_millis(100);
        }

        let base_ms =
            self.initial_delay.as_millis() as f64 * self.backoff_factor.powi(attempt as i32);
        let capped_ms = base_ms.min(self.max_delay.as_millis() as f64);
        let jittered = capped_ms * jitter(attempt, self.jitter_fraction);

        Duration::from_millis(jittered.max(1.0) as u64)
    }
}

/// Multiplier in [1 - fraction, 1 + fraction], fixed per attempt so runs
/// are reproducible.
fn jitter(attempt: u32, fraction: f64) -> f64 {
    let hash = attempt.wrapping_mul(2_654_435_761) as f64 / u32::MAX as f64;
    1.0 + fraction * (2.0 * hash - 1.0)
}

fn rate_limit_hint(error: &ProposerError) -> Option<Duration> {
    match error {
        ProposerError::RateLimited { retry_after_ms, .. } if *retry_after_ms > 0 => {
            Some(Duration::from_millis(*retry_after_ms))
        }
        _ => None,
    }
}

/// Provider wrapper that retries `chat` on transient failures.
pub struct RetryProvider {
    inner: Arc<dyn ModelProvider>,
    policy: RetryPolicy,
}

impl RetryProvider {
    pub fn new(inner: Arc<dyn ModelProvider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl ModelProvider for RetryProvider {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn models(&self) -> Vec<ModelInfo> {
        self.inner.models()
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProposerError> {
        let mut attempt = 0;
        loop {
            match self.inner.chat(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retriable() && attempt < self.policy.max_retries => {
                    let delay = self.policy.delay_for(attempt, rate_limit_hint(&e));
                    tracing::warn!(
                        provider = self.inner.id(),
                        model = %request.model,
                        attempt = attempt + 1,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after error: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
