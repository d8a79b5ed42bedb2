//! Per-frame signal motion.

use crate::config::{FrameStep, GameTuning};

/// Result of moving the signal for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Motion {
    /// Still on the track at the new position.
    Moved(f64),
    /// Would have left the track past its positive end.
    Overrun,
}

/// Speed multiplier for a given score: `1 + score * step`.
pub fn speed_multiplier(tuning: &GameTuning, score: u32) -> f64 {
    1.0 + score as f64 * tuning.speed_step
}

/// Sanitized frame delta in seconds.
pub fn frame_delta(delta_secs: f64) -> f64 {
    if delta_secs.is_finite() && delta_secs > 0.0 {
        delta_secs
    } else {
        0.0
    }
}

pub fn step_size(tuning: &GameTuning, score: u32, delta_secs: f64) -> f64 {
    let base = tuning.speed * speed_multiplier(tuning, score);
    match tuning.frame_step {
        FrameStep::Fixed => base,
        FrameStep::DeltaScaled { reference_hz } => base * frame_delta(delta_secs) * reference_hz,
    }
}

pub fn advance(tuning: &GameTuning, position: f64, score: u32, delta_secs: f64) -> Motion {
    let next = position + step_size(tuning, score, delta_secs);
    if next > tuning.half_track() {
        Motion::Overrun
    } else {
        Motion::Moved(next)
    }
}

/// Count down a cooldown by `delta`, never below zero.
pub fn tick_cooldown(remaining: f64, delta_secs: f64) -> f64 {
    (remaining - frame_delta(delta_secs)).max(0.0)
}
