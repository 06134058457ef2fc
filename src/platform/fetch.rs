//! Same-origin static file fetches

use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

/// GET a text resource
pub async fn fetch_text(url: &str) -> Result<String, JsValue> {
    let resp = fetch_ok(url).await?;
    let text = JsFuture::from(resp.text()?).await?;
    text.as_string().ok_or_else(|| "response is not text".into())
}

/// GET and parse a JSON resource
pub async fn fetch_json(url: &str) -> Result<serde_json::Value, JsValue> {
    let text = fetch_text(url).await?;
    serde_json::from_str(&text).map_err(|e| JsValue::from_str(&e.to_string()))
}

async fn fetch_ok(url: &str) -> Result<web_sys::Response, JsValue> {
    let window = web_sys::window().ok_or("no window")?;
    let resp_value = JsFuture::from(window.fetch_with_str(url)).await?;
    let resp: web_sys::Response = resp_value.dyn_into()?;
    if !resp.ok() {
        return Err(format!("HTTP {}: {}", resp.status(), resp.status_text()).into());
    }
    Ok(resp)
}
