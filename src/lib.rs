//! Neural Link core crate.
//!
//! The "Neural Calibrator" reaction-timing mini-game: a signal crosses a track
//! and the player fires when it sits inside the center zone. Five hits in a
//! row earn a short generated reward line. Gameplay (`game`), configuration
//! (`config`) and the reward fetcher (`reward`) are plain Rust and testable on
//! the host; `widget` mounts the game into a page via `start_game()` or
//! `new NeuralLink(...)` from JS.

use wasm_bindgen::prelude::*;

pub mod config;
pub mod game;
pub mod logging;
pub mod reward;
pub mod widget;

pub use config::{AppConfig, ConfigError, FrameStep, GameTuning, RewardConfig};
pub use game::{
    ControllerState, HudSnapshot, Phase, RewardTicket, RoundController, SessionStatus,
    TriggerOutcome,
};
pub use reward::{RewardError, RewardFetcher, TextGenerator};
pub use widget::NeuralLink;

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    logging::init(log::LevelFilter::Info);
}

// -----------------------------------------------------------------------------
// Unified entrypoint
// -----------------------------------------------------------------------------

/// Mount a calibrator into `<body>` with an optional JSON config.
#[wasm_bindgen]
pub fn start_game(config_json: Option<String>) -> Result<NeuralLink, JsValue> {
    NeuralLink::new(None, config_json)
}
