use thiserror::Error;
use wasm_bindgen::JsValue;

pub type Result<T> = std::result::Result<T, BridgeError>;

/// A single failed delivery to a tab, e.g. "Receiving end does not exist"
/// while the content script is still being injected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DeliveryError(pub String);

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed after {attempts} retries: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: DeliveryError,
    },

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("browser api error: {0}")]
    Browser(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BridgeError {
    pub fn browser(err: JsValue) -> Self {
        BridgeError::Browser(describe_js(&err))
    }
}

impl From<BridgeError> for JsValue {
    fn from(err: BridgeError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

/// Best-effort text for a thrown JS value (Error objects carry `message`).
pub fn describe_js(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    js_sys::Reflect::get(value, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}
