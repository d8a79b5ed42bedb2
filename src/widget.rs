//! Browser host for the calibrator.
//!
//! Owns the canvas, the DOM overlays (HUD, start screen, win screen,
//! CALIBRATE button), the input listeners and the `requestAnimationFrame`
//! loop. Gameplay lives in [`RoundController`]; this module only feeds it
//! frames and input and draws what it reports. JS holds a [`NeuralLink`]
//! handle and tears everything down with `dispose()`.

use std::cell::RefCell;
use std::rc::Rc;

use log::{error, info};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, EventTarget, HtmlCanvasElement, HtmlElement,
    KeyboardEvent, window,
};

use crate::config::AppConfig;
use crate::game::{ControllerState, Phase, RewardTicket, RoundController};
use crate::reward::RewardFetcher;

const CANVAS_W: u32 = 800;
const CANVAS_H: u32 = 400;
const TRACK_MARGIN: f64 = 60.0;
// Long pauses (hidden tab) should not fast-forward delta-scaled motion.
const MAX_FRAME_DELTA_SECS: f64 = 0.25;
const PENDING_REWARD_TEXT: &str = "Generating insight...";

const SEGMENT_ON: &str = "width:8px; height:24px; border-radius:2px; background:#22d3ee; box-shadow:0 0 10px rgba(34,211,238,0.8);";
const SEGMENT_OFF: &str = "width:8px; height:24px; border-radius:2px; background:#1e293b;";

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

struct Listener {
    target: EventTarget,
    event: &'static str,
    closure: Closure<dyn FnMut(web_sys::Event)>,
}

struct Overlays {
    start: HtmlElement,
    start_button: HtmlElement,
    win: HtmlElement,
    reward_text: HtmlElement,
    reset_button: HtmlElement,
    calibrate: HtmlElement,
    segments: Vec<HtmlElement>,
}

struct WidgetState {
    controller: RoundController,
    fetcher: Rc<RewardFetcher>,
    root: HtmlElement,
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    overlays: Overlays,
    frame: FrameCallback,
    frame_handle: Option<i32>,
    last_frame_ms: Option<f64>,
    spin: f64,
    listeners: Vec<Listener>,
    disposed: bool,
}

/// JS handle to one mounted calibrator.
#[wasm_bindgen]
pub struct NeuralLink {
    state: Rc<RefCell<WidgetState>>,
}

#[wasm_bindgen]
impl NeuralLink {
    /// Mount into the element with `container_id` (or `<body>`), configured by
    /// an optional JSON `AppConfig`.
    #[wasm_bindgen(constructor)]
    pub fn new(container_id: Option<String>, config_json: Option<String>) -> Result<NeuralLink, JsValue> {
        let config = match config_json.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(json) => AppConfig::from_json(json).map_err(|e| {
                error!("rejecting calibrator config: {e}");
                JsValue::from_str(&e.to_string())
            })?,
            None => AppConfig::default(),
        };

        let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
        let doc = win
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let host: Element = match container_id.as_deref() {
            Some(id) => doc
                .get_element_by_id(id)
                .ok_or_else(|| JsValue::from_str(&format!("no element #{id}")))?,
            None => doc
                .body()
                .ok_or_else(|| JsValue::from_str("no body"))?
                .into(),
        };

        let root = element(
            &doc,
            "div",
            "position:relative; width:100%; height:400px; background:#020617; border-radius:12px; overflow:hidden; border:1px solid #1e293b; font-family:'Fira Code', monospace;",
            None,
        )?;
        root.set_class_name("neural-link");

        let canvas: HtmlCanvasElement = doc.create_element("canvas")?.dyn_into()?;
        canvas.set_width(CANVAS_W);
        canvas.set_height(CANVAS_H);
        canvas.set_attribute("style", "display:block; width:100%; height:100%;")?;
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("no 2d context"))?
            .dyn_into()?;
        root.append_child(&canvas)?;

        let overlays = build_overlays(&doc, &root, config.tuning.win_score)?;
        host.append_child(&root)?;

        let fetcher = Rc::new(RewardFetcher::from_config(&config.reward));
        info!(
            "calibrator mounted (reward service {})",
            if fetcher.is_configured() { "configured" } else { "offline" }
        );

        let state = Rc::new(RefCell::new(WidgetState {
            controller: RoundController::new(config.tuning),
            fetcher,
            root,
            canvas,
            ctx,
            overlays,
            frame: Rc::new(RefCell::new(None)),
            frame_handle: None,
            last_frame_ms: None,
            spin: 0.0,
            listeners: Vec::new(),
            disposed: false,
        }));

        let (start_button, reset_button, calibrate) = {
            let st = state.borrow();
            (
                st.overlays.start_button.clone(),
                st.overlays.reset_button.clone(),
                st.overlays.calibrate.clone(),
            )
        };
        let listeners = vec![
            listen(&state, win.as_ref(), "keydown", |st, evt| {
                if let Some(key) = evt.dyn_ref::<KeyboardEvent>() {
                    if key.code() == "Space" && st.controller.is_playing() {
                        key.prevent_default();
                        st.controller.queue_trigger();
                    }
                }
            })?,
            listen(&state, start_button.as_ref(), "click", |st, _| st.start())?,
            listen(&state, calibrate.as_ref(), "click", |st, _| {
                st.controller.queue_trigger()
            })?,
            listen(&state, reset_button.as_ref(), "click", |st, _| st.reset())?,
        ];
        state.borrow_mut().listeners = listeners;

        start_loop(&state)?;
        state.borrow().sync_overlays();
        Ok(NeuralLink { state })
    }

    pub fn start(&self) {
        let mut st = self.state.borrow_mut();
        if !st.disposed {
            st.start();
        }
    }

    /// Same as pressing Space: evaluated at the start of the next frame.
    pub fn trigger(&self) {
        self.state.borrow_mut().controller.queue_trigger();
    }

    pub fn reset(&self) {
        let mut st = self.state.borrow_mut();
        if !st.disposed {
            st.reset();
        }
    }

    /// Stop the loop, drop listeners and DOM, and abort any reward in flight.
    pub fn dispose(&self) {
        self.state.borrow_mut().teardown();
    }

    #[wasm_bindgen(js_name = hudJson)]
    pub fn hud_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state.borrow().controller.snapshot())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

impl Drop for NeuralLink {
    fn drop(&mut self) {
        if let Ok(mut st) = self.state.try_borrow_mut() {
            st.teardown();
        }
    }
}

impl WidgetState {
    fn start(&mut self) {
        self.fetcher.cancel();
        self.controller.start();
        self.last_frame_ms = None;
        self.sync_overlays();
    }

    fn reset(&mut self) {
        self.fetcher.cancel();
        self.controller.reset();
        self.sync_overlays();
    }

    fn teardown(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.fetcher.cancel();
        self.controller.dispose();
        if let (Some(w), Some(handle)) = (window(), self.frame_handle.take()) {
            let _ = w.cancel_animation_frame(handle);
        }
        // Breaks the closure <-> cell cycle so the loop can be freed.
        self.frame.borrow_mut().take();
        for l in self.listeners.drain(..) {
            let _ = l
                .target
                .remove_event_listener_with_callback(l.event, l.closure.as_ref().unchecked_ref());
        }
        self.root.remove();
        info!("calibrator disposed");
    }

    fn render(&self) {
        self.draw_scene();
        self.sync_overlays();
    }

    fn draw_scene(&self) {
        let ctx = &self.ctx;
        let w = self.canvas.width() as f64;
        let h = self.canvas.height() as f64;
        let tuning = self.controller.tuning();
        let half = tuning.half_track();
        let unit = (w - 2.0 * TRACK_MARGIN) / tuning.track_length;
        let to_px = |x: f64| TRACK_MARGIN + (x + half) * unit;
        let cy = h / 2.0;

        ctx.set_fill_style_str("#020617");
        ctx.fill_rect(0.0, 0.0, w, h);

        // Track
        ctx.set_stroke_style_str("#334155");
        ctx.set_line_width(1.0);
        line(ctx, to_px(-half), cy, to_px(half), cy);

        // Target zone: faint band plus two edge markers, lit on a hit
        let zone_half = self.controller.zone().half_width();
        let lit = self.controller.state() == ControllerState::Hit
            || (self.controller.state() == ControllerState::Won
                && self.controller.phase() == Phase::Hit);
        ctx.set_fill_style_str("rgba(255,255,255,0.05)");
        ctx.fill_rect(to_px(-zone_half), cy - unit / 2.0, zone_half * 2.0 * unit, unit);
        ctx.set_fill_style_str(if lit { "#ffffff" } else { "#475569" });
        for edge in [-zone_half, zone_half] {
            ctx.fill_rect(to_px(edge) - 1.5, cy - unit, 3.0, 2.0 * unit);
        }

        // Signal
        let (color, scale, glow) = match self.controller.phase() {
            Phase::Traveling => ("#f8fafc", 0.3, 6.0),
            Phase::Hit => ("#22d3ee", 0.5, 24.0),
            Phase::Miss => ("#ef4444", 0.2, 6.0),
        };
        draw_signal(
            ctx,
            to_px(self.controller.position()),
            cy,
            scale * unit,
            self.spin,
            color,
            glow,
        );

        ctx.set_fill_style_str("#64748b");
        ctx.set_font("16px 'Fira Code', monospace");
        ctx.set_text_align("center");
        ctx.fill_text("Press CALIBRATE when signal aligns", w / 2.0, cy + 1.5 * unit + 8.0)
            .ok();
    }

    fn sync_overlays(&self) {
        let state = self.controller.state();
        let o = &self.overlays;
        set_visible(&o.start, state == ControllerState::Idle, "flex");
        set_visible(&o.win, state == ControllerState::Won, "flex");
        set_visible(
            &o.calibrate,
            matches!(
                state,
                ControllerState::Traveling | ControllerState::Hit | ControllerState::Miss
            ),
            "block",
        );
        if state == ControllerState::Won {
            let text = match self.controller.reward() {
                Some(r) => format!("\"{r}\""),
                None => PENDING_REWARD_TEXT.to_string(),
            };
            o.reward_text.set_text_content(Some(&text));
        }
        let score = self.controller.score() as usize;
        for (i, seg) in o.segments.iter().enumerate() {
            let _ = seg.set_attribute("style", if i < score { SEGMENT_ON } else { SEGMENT_OFF });
        }
    }
}

// --- Frame loop --------------------------------------------------------------

fn start_loop(state: &Rc<RefCell<WidgetState>>) -> Result<(), JsValue> {
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let weak = Rc::downgrade(state);
    let frame = state.borrow().frame.clone();
    let f = frame.clone();
    *frame.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
        let Some(st) = weak.upgrade() else {
            return;
        };
        on_frame(&st, ts);
        if st.borrow().disposed {
            return;
        }
        if let (Some(w), Some(cb)) = (window(), f.borrow().as_ref()) {
            if let Ok(handle) = w.request_animation_frame(cb.as_ref().unchecked_ref()) {
                st.borrow_mut().frame_handle = Some(handle);
            }
        }
    }) as Box<dyn FnMut(f64)>));

    let handle = {
        let cb = frame.borrow();
        let cb = cb
            .as_ref()
            .ok_or_else(|| JsValue::from_str("frame callback missing"))?;
        win.request_animation_frame(cb.as_ref().unchecked_ref())?
    };
    state.borrow_mut().frame_handle = Some(handle);
    Ok(())
}

fn on_frame(state: &Rc<RefCell<WidgetState>>, ts: f64) {
    let ticket = {
        let mut st = state.borrow_mut();
        if st.disposed {
            return;
        }
        let delta = st
            .last_frame_ms
            .map(|prev| ((ts - prev) / 1000.0).clamp(0.0, MAX_FRAME_DELTA_SECS))
            .unwrap_or(0.0);
        st.last_frame_ms = Some(ts);
        st.controller.advance_frame(delta);
        st.spin += 0.1;
        let ticket = st.controller.take_reward_request();
        st.render();
        ticket
    };
    if let Some(ticket) = ticket {
        dispatch_reward(state, ticket);
    }
}

/// Fetch the reward off the frame loop; a result for a stale session is dropped
/// by `apply_reward`.
fn dispatch_reward(state: &Rc<RefCell<WidgetState>>, ticket: RewardTicket) {
    let fetcher = state.borrow().fetcher.clone();
    let weak = Rc::downgrade(state);
    info!("requesting reward for session {}", ticket.epoch());
    spawn_local(async move {
        let text = fetcher.fetch_reward().await;
        if let Some(st) = weak.upgrade() {
            let mut st = st.borrow_mut();
            if st.controller.apply_reward(ticket, text) {
                st.sync_overlays();
            }
        }
    });
}

fn listen(
    state: &Rc<RefCell<WidgetState>>,
    target: &EventTarget,
    event: &'static str,
    mut handler: impl FnMut(&mut WidgetState, web_sys::Event) + 'static,
) -> Result<Listener, JsValue> {
    let weak = Rc::downgrade(state);
    let closure = Closure::wrap(Box::new(move |evt: web_sys::Event| {
        if let Some(st) = weak.upgrade() {
            let mut st = st.borrow_mut();
            if !st.disposed {
                handler(&mut *st, evt);
            }
        }
    }) as Box<dyn FnMut(web_sys::Event)>);
    target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    Ok(Listener {
        target: target.clone(),
        event,
        closure,
    })
}

// --- DOM ---------------------------------------------------------------------

fn element(
    doc: &Document,
    tag: &str,
    style: &str,
    text: Option<&str>,
) -> Result<HtmlElement, JsValue> {
    let el: HtmlElement = doc.create_element(tag)?.dyn_into()?;
    el.set_attribute("style", style)?;
    if let Some(t) = text {
        el.set_text_content(Some(t));
    }
    Ok(el)
}

fn set_visible(el: &HtmlElement, visible: bool, display: &str) {
    let _ = el
        .style()
        .set_property("display", if visible { display } else { "none" });
}

fn build_overlays(doc: &Document, root: &HtmlElement, win_score: u32) -> Result<Overlays, JsValue> {
    const OVERLAY: &str = "position:absolute; inset:0; z-index:20; flex-direction:column; align-items:center; justify-content:center; text-align:center; padding:0 16px;";
    const PANEL: &str = "background:rgba(15,23,42,0.8); padding:8px 16px; border-radius:4px; border:1px solid #1e293b;";

    // HUD: title block on the left, progress segments on the right
    let hud = element(
        doc,
        "div",
        "position:absolute; top:0; left:0; width:100%; padding:16px; box-sizing:border-box; display:flex; justify-content:space-between; align-items:flex-start; z-index:10; pointer-events:none;",
        None,
    )?;
    let title = element(doc, "div", PANEL, None)?;
    let heading = element(doc, "div", "color:#e2e8f0; font-weight:bold;", Some("Neural Calibrator"))?;
    title.append_child(&heading)?;
    let caption = element(doc, "div", "color:#64748b; font-size:12px; margin-top:4px;", Some("Optimization Level"))?;
    title.append_child(&caption)?;
    hud.append_child(&title)?;
    let bar = element(doc, "div", &format!("{PANEL} display:flex; gap:4px;"), None)?;
    let mut segments = Vec::with_capacity(win_score as usize);
    for _ in 0..win_score {
        let seg = element(doc, "div", SEGMENT_OFF, None)?;
        bar.append_child(&seg)?;
        segments.push(seg);
    }
    hud.append_child(&bar)?;
    root.append_child(&hud)?;

    let start = element(doc, "div", &format!("{OVERLAY} display:flex; background:rgba(2,6,23,0.8);"), None)?;
    let standby = element(doc, "h3", "color:#fff; font-size:24px; margin:0 0 8px;", Some("System Standby"))?;
    start.append_child(&standby)?;
    let instructions = element(
        doc,
        "p",
        "color:#94a3b8; font-size:14px; max-width:28rem; margin:0 0 24px;",
        Some("Precision is key to efficient AI. Click \"Calibrate\" exactly when the signal enters the center zone."),
    )?;
    start.append_child(&instructions)?;
    let start_button = element(
        doc,
        "button",
        "padding:12px 32px; background:#f1f5f9; color:#020617; font-weight:bold; border:none; border-radius:4px; cursor:pointer;",
        Some("Initialize Sequence"),
    )?;
    start.append_child(&start_button)?;
    root.append_child(&start)?;

    let win = element(doc, "div", &format!("{OVERLAY} display:none; background:rgba(2,6,23,0.95);"), None)?;
    let optimized = element(
        doc,
        "h3",
        "color:#4ade80; font-size:20px; text-transform:uppercase; letter-spacing:0.2em; margin:0 0 16px;",
        Some("Network Optimized"),
    )?;
    win.append_child(&optimized)?;
    let reward_text = element(
        doc,
        "p",
        "color:#cbd5e1; font-size:18px; font-style:italic; max-width:32rem; border-left:2px solid #334155; padding-left:16px; margin:0 0 32px;",
        Some(PENDING_REWARD_TEXT),
    )?;
    win.append_child(&reward_text)?;
    let reset_button = element(
        doc,
        "button",
        "padding:8px 24px; background:transparent; color:#cbd5e1; border:1px solid #334155; border-radius:4px; cursor:pointer;",
        Some("Recalibrate"),
    )?;
    win.append_child(&reset_button)?;
    root.append_child(&win)?;

    let calibrate = element(
        doc,
        "button",
        "display:none; position:absolute; bottom:24px; left:50%; transform:translateX(-50%); z-index:20; padding:16px 48px; background:#f1f5f9; color:#020617; font-weight:bold; letter-spacing:0.2em; border:none; border-radius:4px; box-shadow:0 0 20px rgba(255,255,255,0.2); cursor:pointer;",
        Some("CALIBRATE"),
    )?;
    root.append_child(&calibrate)?;

    Ok(Overlays {
        start,
        start_button,
        win,
        reward_text,
        reset_button,
        calibrate,
        segments,
    })
}

// --- Canvas helpers ------------------------------------------------------------

fn draw_signal(
    ctx: &CanvasRenderingContext2d,
    cx: f64,
    cy: f64,
    r: f64,
    spin: f64,
    color: &str,
    glow: f64,
) {
    use std::f64::consts::TAU;
    ctx.set_shadow_color(color);
    ctx.set_shadow_blur(glow);
    ctx.set_stroke_style_str(color);
    ctx.set_line_width(2.0);
    ctx.begin_path();
    // Spinning wireframe hexagon with three spokes
    for i in 0..=6 {
        let a = spin + i as f64 * TAU / 6.0;
        let (x, y) = (cx + r * a.cos(), cy + r * a.sin());
        if i == 0 {
            ctx.move_to(x, y);
        } else {
            ctx.line_to(x, y);
        }
    }
    for i in 0..3 {
        let a = spin + i as f64 * TAU / 6.0;
        ctx.move_to(cx + r * a.cos(), cy + r * a.sin());
        ctx.line_to(cx - r * a.cos(), cy - r * a.sin());
    }
    ctx.stroke();
    ctx.set_shadow_blur(0.0);
}

fn line(ctx: &CanvasRenderingContext2d, x1: f64, y1: f64, x2: f64, y2: f64) {
    ctx.begin_path();
    ctx.move_to(x1, y1);
    ctx.line_to(x2, y2);
    ctx.stroke();
}
