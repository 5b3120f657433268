// Content script injected into the web app's pages.
// Build with --no-default-features, like the background worker.

use jarvis_extension::config::BridgeConfig;
use jarvis_extension::relay;
use wasm_bindgen::prelude::*;

fn main() {}

#[wasm_bindgen]
pub fn init_content_relay() -> Result<(), JsValue> {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Jarvis content script loaded");

    relay::browser::start(BridgeConfig::bundled())?;
    Ok(())
}
