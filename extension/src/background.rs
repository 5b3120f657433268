// Background service worker for Jarvis
// No Dioxus here; build with --no-default-features
// JavaScript glue only forwards chrome events into these exports

use jarvis_extension::services::runtime::{self, ResponseMode};
use jarvis_extension::services::{ChromeStorage, ChromeTabs};
use jarvis_extension::worker::{self, BackgroundRequest, MAIN_PAGE};
use serde_json::json;
use wasm_bindgen::prelude::*;

// Dummy main for binary target
fn main() {}

/// Initialize background service worker
#[wasm_bindgen]
pub fn init_background() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Jarvis background service initialized");

    runtime::serve_requests(Box::new(|message: serde_json::Value| {
        let request: BackgroundRequest = serde_json::from_value(message).ok()?;
        Some(ResponseMode::Later(Box::new(move |responder: runtime::Responder| {
            wasm_bindgen_futures::spawn_local(async move {
                let main_page = runtime::get_url(MAIN_PAGE);
                let response =
                    worker::handle_request(&ChromeStorage, &ChromeTabs, request, &main_page)
                        .await
                        .unwrap_or_else(|e| {
                            log::error!("Background request failed: {}", e);
                            json!({ "success": false, "error": e.to_string() })
                        });
                responder.send(&response);
            });
        })))
    }));
}

/// Handle extension installation
#[wasm_bindgen]
pub fn handle_install() {
    log::info!("Extension installed or updated");
    wasm_bindgen_futures::spawn_local(async {
        if let Err(e) = worker::handle_install(&ChromeStorage).await {
            log::error!("Could not seed storage: {}", e);
        }
    });
}

/// Handle extension icon click (only fires when no popup is set)
#[wasm_bindgen]
pub fn handle_icon_click() {
    wasm_bindgen_futures::spawn_local(async {
        let main_page = runtime::get_url(MAIN_PAGE);
        if let Err(e) = worker::open_main_page(&ChromeTabs, &main_page).await {
            log::error!("Could not open dashboard: {}", e);
        }
    });
}
