//! Gemini `generateContent` client over the browser `fetch` API.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, AbortSignal, Request, RequestInit, RequestMode, Response, Window};

use super::{RewardError, TextGenerator};
use crate::config::RewardConfig;

// --- Wire format -------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub thinking_budget: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub thinking_config: ThinkingConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate; empty when there is none.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Parse a response body into its (trimmed) text.
pub fn parse_response(body: &str) -> Result<String, RewardError> {
    let resp: GenerateContentResponse = serde_json::from_str(body)?;
    Ok(resp.text().trim().to_string())
}

// --- Client ------------------------------------------------------------------

#[derive(Debug)]
pub struct GeminiClient {
    endpoint: String,
    model: String,
    api_key: String,
    max_output_tokens: u32,
    temperature: f32,
    thinking_budget: u32,
    timeout_ms: u32,
    in_flight: RefCell<Option<AbortController>>,
}

impl GeminiClient {
    pub fn new(cfg: &RewardConfig, api_key: String) -> Self {
        Self {
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            api_key,
            max_output_tokens: cfg.max_output_tokens,
            temperature: cfg.temperature,
            thinking_budget: cfg.thinking_budget,
            timeout_ms: cfg.timeout_ms,
            in_flight: RefCell::new(None),
        }
    }

    pub fn request_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    pub fn request_body(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_output_tokens,
                temperature: self.temperature,
                thinking_config: ThinkingConfig {
                    thinking_budget: self.thinking_budget,
                },
            },
        }
    }

    /// POST request for `prompt`, credential in the `x-goog-api-key` header.
    pub fn build_request(&self, prompt: &str, signal: &AbortSignal) -> Result<Request, RewardError> {
        let body = serde_json::to_string(&self.request_body(prompt))?;
        let init = RequestInit::new();
        init.set_method("POST");
        init.set_mode(RequestMode::Cors);
        init.set_body(&JsValue::from_str(&body));
        init.set_signal(Some(signal));
        let request = Request::new_with_str_and_init(&self.request_url(), &init)
            .map_err(|e| js_error("request", e))?;
        let headers = request.headers();
        headers
            .set("Content-Type", "application/json")
            .map_err(|e| js_error("headers", e))?;
        headers
            .set("x-goog-api-key", &self.api_key)
            .map_err(|e| js_error("headers", e))?;
        Ok(request)
    }

    async fn send(&self, window: &Window, request: &Request) -> Result<String, RewardError> {
        let resp: Response = JsFuture::from(window.fetch_with_request(request))
            .await
            .map_err(|e| js_error("fetch", e))?
            .dyn_into()
            .map_err(|e| js_error("fetch: expected Response", e))?;
        if !resp.ok() {
            return Err(RewardError::Status(resp.status()));
        }
        let body = JsFuture::from(resp.text().map_err(|e| js_error("response text", e))?)
            .await
            .map_err(|e| js_error("response text", e))?
            .as_string()
            .ok_or_else(|| RewardError::Request("response text: not a string".into()))?;
        parse_response(&body)
    }
}

fn js_error(context: &str, value: JsValue) -> RewardError {
    RewardError::Request(format!("{context}: {value:?}"))
}

#[async_trait(?Send)]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, RewardError> {
        let window = web_sys::window().ok_or_else(|| RewardError::Request("no window".into()))?;
        let abort = AbortController::new().map_err(|e| js_error("abort controller", e))?;
        let request = self.build_request(prompt, &abort.signal())?;

        let timed_out = Rc::new(Cell::new(false));
        let on_timeout = {
            let abort = abort.clone();
            let timed_out = timed_out.clone();
            Closure::once(move || {
                timed_out.set(true);
                abort.abort();
            })
        };
        let timer = window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                on_timeout.as_ref().unchecked_ref(),
                self.timeout_ms.min(i32::MAX as u32) as i32,
            )
            .map_err(|e| js_error("timeout", e))?;

        self.in_flight.replace(Some(abort.clone()));
        let result = self.send(&window, &request).await;
        self.in_flight.replace(None);
        window.clear_timeout_with_handle(timer);
        drop(on_timeout);

        match result {
            Err(_) if timed_out.get() => Err(RewardError::Timeout(self.timeout_ms)),
            Err(_) if abort.signal().aborted() => Err(RewardError::Cancelled),
            other => other,
        }
    }

    fn cancel(&self) {
        if let Some(abort) = self.in_flight.take() {
            abort.abort();
        }
    }
}
