//! Reward line shown after a won session.
//!
//! [`RewardFetcher::fetch_reward`] always produces a string: the generated
//! text when the service answers, otherwise one of the fixed fallbacks. Errors
//! are logged and never reach the caller.

pub mod gemini;

use async_trait::async_trait;
use log::{debug, warn};
use thiserror::Error;

use crate::config::RewardConfig;
pub use gemini::GeminiClient;

/// Returned without a network attempt when no credential is configured.
pub const FALLBACK_UNCONFIGURED: &str =
    "Intelligence is the ability to adapt to change. - Stephen Hawking";
/// Returned when the service answers with no text.
pub const FALLBACK_EMPTY: &str = "The future belongs to those who prepare for it today.";
/// Returned when the request fails in any way.
pub const FALLBACK_ERROR: &str = "Innovation distinguishes between a leader and a follower.";

#[derive(Debug, Error)]
pub enum RewardError {
    #[error("no text-generation credential configured")]
    Unconfigured,

    #[error("request failed: {0}")]
    Request(String),

    #[error("service responded with HTTP {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("request timed out after {0} ms")]
    Timeout(u32),

    #[error("request cancelled")]
    Cancelled,
}

/// A text-generation backend. Futures are `!Send`: they run on the browser
/// event loop.
#[async_trait(?Send)]
pub trait TextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, RewardError>;

    /// Abort whatever request is in flight; it resolves with
    /// [`RewardError::Cancelled`].
    fn cancel(&self) {}
}

pub struct RewardFetcher {
    generator: Option<Box<dyn TextGenerator>>,
    prompt: String,
}

impl RewardFetcher {
    pub fn new(generator: Box<dyn TextGenerator>, prompt: impl Into<String>) -> Self {
        Self {
            generator: Some(generator),
            prompt: prompt.into(),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            generator: None,
            prompt: crate::config::DEFAULT_PROMPT.to_string(),
        }
    }

    /// Builds a Gemini-backed fetcher when a credential resolves, else an
    /// unconfigured one.
    pub fn from_config(cfg: &RewardConfig) -> Self {
        match cfg.resolved_api_key() {
            Some(key) => Self::new(Box::new(GeminiClient::new(cfg, key)), cfg.prompt.clone()),
            None => {
                debug!("no reward credential, using local fallback");
                Self::unconfigured()
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Abort an in-flight generation, if any.
    pub fn cancel(&self) {
        if let Some(generator) = &self.generator {
            generator.cancel();
        }
    }

    /// The raw outcome, trimmed. Empty text is `Ok("")`.
    pub async fn try_fetch(&self) -> Result<String, RewardError> {
        let generator = self.generator.as_ref().ok_or(RewardError::Unconfigured)?;
        let text = generator.generate(&self.prompt).await?;
        Ok(text.trim().to_string())
    }

    pub async fn fetch_reward(&self) -> String {
        match self.try_fetch().await {
            Ok(text) if text.is_empty() => FALLBACK_EMPTY.to_string(),
            Ok(text) => text,
            Err(RewardError::Unconfigured) => FALLBACK_UNCONFIGURED.to_string(),
            Err(RewardError::Cancelled) => {
                debug!("reward generation cancelled");
                FALLBACK_ERROR.to_string()
            }
            Err(e) => {
                warn!("reward generation failed: {e}");
                FALLBACK_ERROR.to_string()
            }
        }
    }
}
