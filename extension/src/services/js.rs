// serde_json <-> JsValue via the JS JSON object, so chrome payloads and
// our wire types share one serialization path.

use crate::error::{BridgeError, Result};
use serde_json::Value;
use wasm_bindgen::JsValue;

pub fn to_js(value: &Value) -> Result<JsValue> {
    let text = serde_json::to_string(value)?;
    js_sys::JSON::parse(&text).map_err(BridgeError::browser)
}

pub fn from_js(value: &JsValue) -> Result<Value> {
    if value.is_undefined() || value.is_null() {
        return Ok(Value::Null);
    }
    let text = js_sys::JSON::stringify(value)
        .map_err(BridgeError::browser)?
        .as_string()
        .unwrap_or_default();
    Ok(serde_json::from_str(&text)?)
}
