use crate::app::ports::TranslatorPort;
use crate::config::TranslationConfig;
use crate::error::TranslationError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Exponential backoff settings for translation calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based), capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let millis = self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let delay = Duration::from_millis(millis.min(u64::MAX as f64) as u64);
        delay.min(self.max_delay)
    }
}

/// Bounds every call with a timeout and retries transient failures.
pub struct ResilientTranslator<T> {
    inner: T,
    policy: RetryPolicy,
    call_timeout: Duration,
}

impl<T: TranslatorPort> ResilientTranslator<T> {
    pub fn new(inner: T, policy: RetryPolicy, call_timeout: Duration) -> Self {
        Self {
            inner,
            policy,
            call_timeout,
        }
    }

    async fn attempt(&self, word: &str, target_language: &str) -> Result<String, TranslationError> {
        match timeout(self.call_timeout, self.inner.translate_word(word, target_language)).await {
            Ok(result) => result,
            Err(_) => Err(TranslationError::Timeout(self.call_timeout)),
        }
    }
}

#[async_trait]
impl<T: TranslatorPort> TranslatorPort for ResilientTranslator<T> {
    async fn translate_word(&self, word: &str, target_language: &str) -> Result<String, TranslationError> {
        let mut attempt = 0;
        loop {
            match self.attempt(word, target_language).await {
                Ok(translated) => {
                    if attempt > 0 {
                        debug!("Translation of '{}' succeeded after {} retries", word, attempt);
                    }
                    return Ok(translated);
                }
                Err(err) if err.is_transient() && attempt < self.policy.max_retries => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        "Translation of '{}' failed on attempt {} ({}), retrying in {:?}",
                        word,
                        attempt + 1,
                        err,
                        delay
                    );
                    crate::observability::metrics::enrich::translation_retry();
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    crate::observability::metrics::enrich::translation_error(err.is_transient());
                    return Err(err);
                }
            }
        }
    }
}
