// The web app page as seen from the content script

use crate::error::{BridgeError, Result};
use crate::relay::HostWindow;
use crate::services::js;
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::MessageEvent;

pub struct BrowserWindow {
    window: web_sys::Window,
}

impl BrowserWindow {
    pub fn new() -> Result<Self> {
        let window =
            web_sys::window().ok_or_else(|| BridgeError::Browser("no window object".into()))?;
        Ok(Self { window })
    }

    /// Calls `handler(origin, data)` for every `message` event on the window.
    pub fn on_message(&self, handler: impl Fn(&str, &Value) + 'static) -> Result<()> {
        let callback = Closure::wrap(Box::new(move |event: MessageEvent| {
            // Payloads we cannot read as JSON cannot be ours
            if let Ok(data) = js::from_js(&event.data()) {
                handler(&event.origin(), &data);
            }
        }) as Box<dyn FnMut(MessageEvent)>);

        self.window
            .add_event_listener_with_callback("message", callback.as_ref().unchecked_ref())
            .map_err(BridgeError::browser)?;
        callback.forget();
        Ok(())
    }
}

impl HostWindow for BrowserWindow {
    fn open_popup(&self, url: &str, name: &str, features: &str) -> Result<()> {
        match self
            .window
            .open_with_url_and_target_and_features(url, name, features)
            .map_err(BridgeError::browser)?
        {
            Some(_) => Ok(()),
            None => Err(BridgeError::Browser("popup blocked".into())),
        }
    }

    fn post_message(&self, message: &Value, target_origin: &str) -> Result<()> {
        self.window
            .post_message(&js::to_js(message)?, target_origin)
            .map_err(BridgeError::browser)
    }

    fn inject_script(&self, source: &str) -> Result<()> {
        let document = self
            .window
            .document()
            .ok_or_else(|| BridgeError::Browser("no document".into()))?;
        let script = document
            .create_element("script")
            .map_err(BridgeError::browser)?;
        script.set_text_content(Some(source));

        let parent = document
            .document_element()
            .ok_or_else(|| BridgeError::Browser("no document element".into()))?;
        parent.append_child(&script).map_err(BridgeError::browser)?;
        // The script has run once it is attached
        script.remove();
        Ok(())
    }
}
