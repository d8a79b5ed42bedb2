// Browser tests for the mounted widget and the fetch client.
// Run with `wasm-pack test --headless --firefox`.
#![cfg(target_arch = "wasm32")]

use std::rc::Rc;

use neural_link::reward::gemini::GeminiClient;
use neural_link::reward::{FALLBACK_ERROR, FALLBACK_UNCONFIGURED};
use neural_link::{NeuralLink, RewardConfig, RewardError, RewardFetcher, TextGenerator};
use wasm_bindgen_futures::{JsFuture, spawn_local};
use wasm_bindgen_test::*;
use web_sys::AbortController;

wasm_bindgen_test_configure!(run_in_browser);

// Non-routable address: connections hang instead of failing fast.
const BLACKHOLE: &str = "http://10.255.255.1";

fn hud(link: &NeuralLink) -> serde_json::Value {
    serde_json::from_str(&link.hud_json().unwrap()).unwrap()
}

async fn sleep(ms: i32) {
    let promise = js_sys::Promise::new(&mut |resolve, _| {
        web_sys::window()
            .unwrap()
            .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
            .unwrap();
    });
    JsFuture::from(promise).await.unwrap();
}

fn blackhole_client(timeout_ms: u32) -> GeminiClient {
    let cfg = RewardConfig {
        endpoint: BLACKHOLE.to_string(),
        timeout_ms,
        ..RewardConfig::default()
    };
    GeminiClient::new(&cfg, "test-key".to_string())
}

fn mount_point(id: &str) -> web_sys::Element {
    let doc = web_sys::window().unwrap().document().unwrap();
    let host = doc.create_element("div").unwrap();
    host.set_id(id);
    doc.body().unwrap().append_child(&host).unwrap();
    host
}

#[wasm_bindgen_test]
fn mount_start_and_dispose() {
    let link = NeuralLink::new(None, None).unwrap();
    assert_eq!(hud(&link)["state"], "idle");

    link.start();
    assert_eq!(hud(&link)["state"], "traveling");
    // queued until the next animation frame
    link.trigger();
    assert_eq!(hud(&link)["state"], "traveling");

    link.dispose();
    let doc = web_sys::window().unwrap().document().unwrap();
    assert!(doc.query_selector(".neural-link").unwrap().is_none());
    assert_eq!(hud(&link)["state"], "idle");
}

#[wasm_bindgen_test]
fn invalid_config_is_rejected() {
    for json in [r#"{"tuning": {"win_score": 0}}"#, r#"{"tuning": {"win_score": 4294967295}}"#] {
        assert!(NeuralLink::new(None, Some(json.to_string())).is_err(), "accepted {json}");
    }
}

#[wasm_bindgen_test]
fn missing_container_is_an_error() {
    assert!(NeuralLink::new(Some("no-such-element".to_string()), None).is_err());
}

#[wasm_bindgen_test]
fn request_carries_key_header_and_body() {
    let client = blackhole_client(8_000);
    let abort = AbortController::new().unwrap();
    let request = client.build_request("hello", &abort.signal()).unwrap();
    assert_eq!(request.method(), "POST");
    assert_eq!(
        request.url(),
        "http://10.255.255.1/models/gemini-2.5-flash:generateContent"
    );
    let headers = request.headers();
    assert_eq!(headers.get("x-goog-api-key").unwrap().as_deref(), Some("test-key"));
    assert_eq!(
        headers.get("content-type").unwrap().as_deref(),
        Some("application/json")
    );
    assert!(!request.url().contains("test-key"));
}

#[wasm_bindgen_test]
async fn slow_service_times_out() {
    let result = blackhole_client(1).generate("hello").await;
    assert!(matches!(result, Err(RewardError::Timeout(1))), "{result:?}");

    let fetcher = RewardFetcher::new(Box::new(blackhole_client(1)), "hello");
    assert_eq!(fetcher.fetch_reward().await, FALLBACK_ERROR);
}

#[wasm_bindgen_test]
async fn cancel_aborts_the_request() {
    let fetcher = Rc::new(RewardFetcher::new(Box::new(blackhole_client(60_000)), "hello"));
    let canceller = fetcher.clone();
    spawn_local(async move {
        sleep(20).await;
        canceller.cancel();
    });
    let result = fetcher.try_fetch().await;
    assert!(matches!(result, Err(RewardError::Cancelled)), "{result:?}");
}

#[wasm_bindgen_test]
async fn winning_shows_the_reward_line() {
    let host = mount_point("win-host");
    // Wide zone and a slow signal: the first frame lands inside and stays there.
    let config = r#"{
        "tuning": {"speed": 0.1, "target_zone_width": 9.9, "win_score": 1},
        "reward": {"api_key": ""}
    }"#;
    let link = NeuralLink::new(Some("win-host".to_string()), Some(config.to_string())).unwrap();
    link.start();

    let mut entered = false;
    for _ in 0..100 {
        sleep(16).await;
        if hud(&link)["position"].as_f64().unwrap() > -4.95 {
            entered = true;
            break;
        }
    }
    assert!(entered, "signal never moved: {}", hud(&link));
    link.trigger();

    let mut snapshot = hud(&link);
    for _ in 0..100 {
        if snapshot["reward"] == FALLBACK_UNCONFIGURED {
            break;
        }
        sleep(16).await;
        snapshot = hud(&link);
    }
    assert_eq!(snapshot["state"], "won");
    assert_eq!(snapshot["reward"], FALLBACK_UNCONFIGURED);
    assert_eq!(snapshot["reward_pending"], false);
    let text = host.text_content().unwrap_or_default();
    assert!(text.contains(FALLBACK_UNCONFIGURED), "overlay text: {text}");

    link.dispose();
    host.remove();
}
