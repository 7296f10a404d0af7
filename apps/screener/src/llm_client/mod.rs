//! LLM client: the single point of entry for every inference call made by the pipeline.
//!
//! ARCHITECTURAL RULE: services never talk to a model API directly. They build a prompt
//! and call `InferenceClient::send`, which owns timeouts, retries and the shared
//! request ceiling. Backends only perform one raw round-trip.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

pub mod anthropic;
pub mod prompts;

pub use anthropic::{AnthropicBackend, MODEL};

/// Typed failure of one inference call, after the client's retry policy ran out.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum InferenceError {
    #[error("inference call timed out")]
    Timeout,

    #[error("rate limited by inference service")]
    RateLimited,

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("transport error: {0}")]
    Transport(String),

    /// The service refused the request outright (4xx other than 429). Never retried.
    #[error("request rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

impl InferenceError {
    /// Timeouts, rate limits and transport errors may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            InferenceError::Timeout | InferenceError::RateLimited | InferenceError::Transport(_)
        )
    }
}

/// One raw round-trip to a reasoning service. Returns the model's text output.
///
/// Implement this to swap providers without touching the client or any service.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, InferenceError>;
}

/// Retry, timeout and concurrency policy for `InferenceClient`.
#[derive(Debug, Clone)]
pub struct ClientPolicy {
    /// Bound on every single attempt. Exceeding it is reported as `Timeout`.
    pub per_call_timeout: Duration,
    /// Extra attempts allowed for transient failures.
    pub max_retries: u32,
    /// Extra attempts allowed for malformed responses. Capped at 1.
    pub max_malformed_retries: u32,
    /// First backoff delay; doubles on every retry.
    pub base_backoff: Duration,
    /// Concurrent requests allowed against the external service.
    pub max_concurrent_requests: usize,
}

impl Default for ClientPolicy {
    fn default() -> Self {
        Self {
            per_call_timeout: Duration::from_secs(120),
            max_retries: 3,
            max_malformed_retries: 1,
            base_backoff: Duration::from_millis(500),
            max_concurrent_requests: 8,
        }
    }
}

/// The inference client shared by all services of a run.
/// Wraps a backend with a semaphore limiter, per-attempt timeouts and retry with backoff.
#[derive(Clone)]
pub struct InferenceClient {
    backend: Arc<dyn InferenceBackend>,
    limiter: Arc<Semaphore>,
    policy: ClientPolicy,
}

impl InferenceClient {
    pub fn new(backend: Arc<dyn InferenceBackend>, policy: ClientPolicy) -> Self {
        let permits = policy.max_concurrent_requests.max(1);
        Self {
            backend,
            limiter: Arc::new(Semaphore::new(permits)),
            policy,
        }
    }

    /// Sends a prompt and parses the answer as JSON into `T`.
    ///
    /// Transient failures are retried up to `max_retries` times with exponential backoff
    /// (base, 2×base, 4×base, ...). A response that does not parse is retried at most once.
    pub async fn send<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, InferenceError> {
        self.send_with(prompt, system, |value| {
            serde_json::from_value(value).map_err(|e| e.to_string())
        })
        .await
    }

    /// Like `send`, but validates the parsed JSON with `schema`.
    ///
    /// A schema rejection counts as a malformed response and shares its single retry.
    pub async fn send_with<T, F>(
        &self,
        prompt: &str,
        system: &str,
        schema: F,
    ) -> Result<T, InferenceError>
    where
        F: Fn(Value) -> Result<T, String>,
    {
        self.execute(prompt, system, |text| {
            parse_json(text)
                .and_then(|value| schema(value).map_err(InferenceError::MalformedResponse))
        })
        .await
    }

    /// Sends a prompt whose answer is free text. Blank output counts as malformed.
    pub async fn send_text(&self, prompt: &str, system: &str) -> Result<String, InferenceError> {
        self.execute(prompt, system, |text| {
            let text = text.trim();
            if text.is_empty() {
                Err(InferenceError::MalformedResponse(
                    "model returned empty content".to_string(),
                ))
            } else {
                Ok(text.to_string())
            }
        })
        .await
    }

    /// Retry loop shared by every `send_*` flavour.
    async fn execute<T, P>(&self, prompt: &str, system: &str, parse: P) -> Result<T, InferenceError>
    where
        P: Fn(&str) -> Result<T, InferenceError>,
    {
        let malformed_budget = self.policy.max_malformed_retries.min(1);
        let mut transient_retries = 0u32;
        let mut malformed_retries = 0u32;
        let mut attempt = 0u32;

        loop {
            if attempt > 0 {
                let delay = self.backoff(attempt);
                debug!("inference retry {attempt}, backing off {}ms", delay.as_millis());
                tokio::time::sleep(delay).await;
            }
            attempt += 1;

            let result = self
                .attempt(prompt, system)
                .await
                .and_then(|text| parse(text.as_str()));

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let retry = if err.is_transient() {
                transient_retries += 1;
                transient_retries <= self.policy.max_retries
            } else if matches!(err, InferenceError::MalformedResponse(_)) {
                malformed_retries += 1;
                malformed_retries <= malformed_budget
            } else {
                false
            };

            if !retry {
                warn!("inference call failed after {attempt} attempt(s): {err}");
                return Err(err);
            }
            warn!("inference attempt {attempt} failed, will retry: {err}");
        }
    }

    /// One time-bounded round-trip holding a limiter permit.
    async fn attempt(&self, prompt: &str, system: &str) -> Result<String, InferenceError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| InferenceError::Transport(format!("request limiter closed: {e}")))?;

        match tokio::time::timeout(
            self.policy.per_call_timeout,
            self.backend.complete(prompt, system),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(InferenceError::Timeout),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.policy.base_backoff.saturating_mul(1u32 << exp)
    }
}

fn parse_json(text: &str) -> Result<Value, InferenceError> {
    let text = strip_json_fences(text);
    if text.is_empty() {
        return Err(InferenceError::MalformedResponse(
            "model returned empty content".to_string(),
        ));
    }
    serde_json::from_str(text).map_err(|e| InferenceError::MalformedResponse(e.to_string()))
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Scripted backend for tests: pops one canned outcome per call.
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{InferenceBackend, InferenceError};

    pub enum Scripted {
        Reply(String),
        Fail(InferenceError),
        Hang(Duration),
    }

    pub struct ScriptedBackend {
        script: Mutex<VecDeque<Scripted>>,
        pub calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        pub fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InferenceBackend for ScriptedBackend {
        async fn complete(&self, prompt: &str, _system: &str) -> Result<String, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Scripted::Reply(text)) => Ok(text),
                Some(Scripted::Fail(err)) => Err(err),
                Some(Scripted::Hang(d)) => {
                    tokio::time::sleep(d).await;
                    Err(InferenceError::Transport("hung call returned".to_string()))
                }
                None => Err(InferenceError::Transport("script exhausted".to_string())),
            }
        }
    }
}
