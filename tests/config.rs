// Configuration parsing and validation.

use neural_link::{AppConfig, ConfigError, FrameStep, GameTuning};

#[test]
fn empty_object_gives_classic_game() {
    let cfg = AppConfig::from_json("{}").unwrap();
    assert_eq!(cfg, AppConfig::default());
    assert_eq!(cfg.tuning.track_length, 10.0);
    assert_eq!(cfg.tuning.speed, 0.12);
    assert_eq!(cfg.tuning.target_zone_width, 1.5);
    assert_eq!(cfg.tuning.win_score, 5);
    assert_eq!(cfg.tuning.cooldown_secs, 0.5);
    assert_eq!(cfg.tuning.frame_step, FrameStep::Fixed);
    assert_eq!(cfg.reward.model, "gemini-2.5-flash");
    assert_eq!(cfg.reward.max_output_tokens, 50);
}

#[test]
fn partial_overrides_keep_other_defaults() {
    let cfg = AppConfig::from_json(r#"{"tuning": {"win_score": 3}, "reward": {"model": "m"}}"#)
        .unwrap();
    assert_eq!(cfg.tuning.win_score, 3);
    assert_eq!(cfg.tuning.speed, 0.12);
    assert_eq!(cfg.reward.model, "m");
    assert_eq!(cfg.reward.timeout_ms, 8_000);
}

#[test]
fn delta_scaled_frame_step_parses() {
    let cfg = AppConfig::from_json(
        r#"{"tuning": {"frame_step": {"mode": "delta_scaled", "reference_hz": 60.0}}}"#,
    )
    .unwrap();
    assert_eq!(
        cfg.tuning.frame_step,
        FrameStep::DeltaScaled { reference_hz: 60.0 }
    );
}

#[test]
fn malformed_json_is_a_parse_error() {
    assert!(matches!(
        AppConfig::from_json("{tuning:"),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn invalid_tuning_is_rejected() {
    for json in [
        r#"{"tuning": {"win_score": 0}}"#,
        r#"{"tuning": {"win_score": 101}}"#,
        r#"{"tuning": {"win_score": 4294967295}}"#,
        r#"{"tuning": {"speed": -0.1}}"#,
        r#"{"tuning": {"track_length": 0}}"#,
        r#"{"tuning": {"target_zone_width": 10}}"#,
        r#"{"tuning": {"cooldown_secs": -1}}"#,
        r#"{"tuning": {"frame_step": {"mode": "delta_scaled", "reference_hz": 0}}}"#,
    ] {
        assert!(
            matches!(AppConfig::from_json(json), Err(ConfigError::Invalid(_))),
            "accepted {json}"
        );
    }
}

#[test]
fn track_geometry_helpers() {
    let t = GameTuning::default();
    assert_eq!(t.half_track(), 5.0);
    assert_eq!(t.track_start(), -5.0);
    assert!(t.validate().is_ok());
}

#[test]
fn win_score_bounds_are_inclusive() {
    use neural_link::config::MAX_WIN_SCORE;
    for score in [1, MAX_WIN_SCORE] {
        let json = format!(r#"{{"tuning": {{"win_score": {score}}}}}"#);
        assert_eq!(AppConfig::from_json(&json).unwrap().tuning.win_score, score);
    }
}
