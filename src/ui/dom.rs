//! Small DOM helpers shared by the widgets

use wasm_bindgen::JsCast;
use wasm_bindgen::convert::FromWasmAbi;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, EventTarget, HtmlElement, Window};

pub fn window() -> Result<Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("no window"))
}

pub fn document() -> Result<Document, JsValue> {
    window()?
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))
}

pub fn by_id(id: &str) -> Option<Element> {
    document().ok()?.get_element_by_id(id)
}

pub fn by_id_as<T: JsCast>(id: &str) -> Option<T> {
    by_id(id)?.dyn_into().ok()
}

pub fn set_text(id: &str, text: &str) {
    if let Some(el) = by_id(id) {
        el.set_text_content(Some(text));
    }
}

pub fn set_style(el: &Element, property: &str, value: &str) {
    if let Some(el) = el.dyn_ref::<HtmlElement>() {
        if let Err(e) = el.style().set_property(property, value) {
            log::warn!("Failed to set {}: {:?}", property, e);
        }
    }
}

pub fn set_display(id: &str, value: &str) {
    if let Some(el) = by_id(id) {
        set_style(&el, "display", value);
    }
}

pub fn alert(message: &str) {
    if let Ok(w) = window() {
        let _ = w.alert_with_message(message);
    }
}

pub fn confirm(message: &str) -> bool {
    window()
        .and_then(|w| w.confirm_with_message(message))
        .unwrap_or(false)
}

pub fn prompt(message: &str) -> Option<String> {
    window().ok()?.prompt_with_message(message).ok().flatten()
}

/// Register a listener for the page's lifetime
pub fn listen<E>(target: &EventTarget, event: &str, handler: impl FnMut(E) + 'static)
where
    E: FromWasmAbi + 'static,
{
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(E)>);
    if let Err(e) = target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
    {
        log::error!("Failed to listen for '{}': {:?}", event, e);
    }
    closure.forget();
}

/// `listen` on the element with `id`, if present
pub fn on_click(id: &str, handler: impl FnMut(web_sys::MouseEvent) + 'static) {
    match by_id(id) {
        Some(el) => listen(&el, "click", handler),
        None => log::debug!("#{} not found, click handler skipped", id),
    }
}

/// Returns the timer id (0 when the call failed)
pub fn set_timeout(handler: impl FnOnce() + 'static, ms: i32) -> i32 {
    let closure = Closure::once(handler);
    let id = window()
        .and_then(|w| {
            w.set_timeout_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                ms,
            )
        })
        .unwrap_or(0);
    closure.forget();
    id
}

pub fn clear_timeout(id: i32) {
    if let Ok(w) = window() {
        w.clear_timeout_with_handle(id);
    }
}

pub fn set_interval(handler: impl FnMut() + 'static, ms: i32) {
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut()>);
    if let Err(e) = window().and_then(|w| {
        w.set_interval_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            ms,
        )
    }) {
        log::error!("setInterval failed: {:?}", e);
    }
    closure.forget();
}

pub fn request_animation_frame(handler: impl FnOnce(f64) + 'static) {
    let closure = Closure::once(handler);
    if let Err(e) = window().and_then(|w| w.request_animation_frame(closure.as_ref().unchecked_ref()))
    {
        log::error!("requestAnimationFrame failed: {:?}", e);
    }
    closure.forget();
}

/// Seed for a widget's RNG
pub fn clock_seed() -> u64 {
    js_sys::Date::now() as u64
}

/// Minimal HTML escaping for text placed into `innerHTML`
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
