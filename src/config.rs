//! Runtime configuration: game tuning plus the reward service settings.
//!
//! Everything defaults to the stock calibrator values, so
//! an empty JSON object (or no config at all) gives the classic game.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TRACK_LENGTH: f64 = 10.0;
pub const SPEED: f64 = 0.12;
pub const SPEED_STEP: f64 = 0.1;
pub const TARGET_ZONE_WIDTH: f64 = 1.5;
pub const WIN_SCORE: u32 = 5;
/// Upper bound on `win_score`; the HUD draws one segment per point.
pub const MAX_WIN_SCORE: u32 = 100;
pub const COOLDOWN_SECS: f64 = 0.5;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_PROMPT: &str = "Generate a short, profound, and inspiring insight about the future of Artificial Intelligence and Human potential. Maximum 20 words. Do not use quotes.";

/// Compile-time credential, picked up when the runtime config carries none.
const BUILD_API_KEY: Option<&str> = option_env!("NEURAL_LINK_API_KEY");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// How the signal step relates to the frame delta.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FrameStep {
    #[default]
    /// One `speed * multiplier` step per frame regardless of elapsed time.
    Fixed,
    /// Step scaled by `delta * reference_hz`; equals `Fixed` at exactly that rate.
    DeltaScaled { reference_hz: f64 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameTuning {
    pub track_length: f64,
    pub speed: f64,
    pub speed_step: f64,
    pub target_zone_width: f64,
    pub win_score: u32,
    pub cooldown_secs: f64,
    pub frame_step: FrameStep,
}

impl Default for GameTuning {
    fn default() -> Self {
        Self {
            track_length: TRACK_LENGTH,
            speed: SPEED,
            speed_step: SPEED_STEP,
            target_zone_width: TARGET_ZONE_WIDTH,
            win_score: WIN_SCORE,
            cooldown_secs: COOLDOWN_SECS,
            frame_step: FrameStep::Fixed,
        }
    }
}

impl GameTuning {
    pub fn half_track(&self) -> f64 {
        self.track_length / 2.0
    }

    pub fn track_start(&self) -> f64 {
        -self.half_track()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be a positive number, got {v}")))
            }
        };
        positive("track_length", self.track_length)?;
        positive("speed", self.speed)?;
        positive("target_zone_width", self.target_zone_width)?;
        if !(self.speed_step.is_finite() && self.speed_step >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "speed_step must be >= 0, got {}",
                self.speed_step
            )));
        }
        if !(self.cooldown_secs.is_finite() && self.cooldown_secs >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "cooldown_secs must be >= 0, got {}",
                self.cooldown_secs
            )));
        }
        if !(1..=MAX_WIN_SCORE).contains(&self.win_score) {
            return Err(ConfigError::Invalid(format!(
                "win_score must be between 1 and {MAX_WIN_SCORE}, got {}",
                self.win_score
            )));
        }
        if self.target_zone_width >= self.track_length {
            return Err(ConfigError::Invalid(format!(
                "target zone ({}) must be narrower than the track ({})",
                self.target_zone_width, self.track_length
            )));
        }
        if let FrameStep::DeltaScaled { reference_hz } = self.frame_step {
            positive("frame_step.reference_hz", reference_hz)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// `None` or empty means the fetcher never touches the network.
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub prompt: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub thinking_budget: u32,
    pub timeout_ms: u32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            max_output_tokens: 50,
            temperature: 0.7,
            thinking_budget: 0,
            timeout_ms: 8_000,
        }
    }
}

impl RewardConfig {
    /// The credential in effect: runtime value first, then the build-time one.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .or(BUILD_API_KEY)
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tuning: GameTuning,
    pub reward: RewardConfig,
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = serde_json::from_str(json)?;
        cfg.tuning.validate()?;
        Ok(cfg)
    }
}
