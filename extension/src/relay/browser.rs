// Wires the relay into a real page: runtime requests, window messages and
// the navigation guard. Runs once per page load.

use super::Relay;
use crate::clock::SystemClock;
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::protocol::HandshakeRequest;
use crate::scheduler::BrowserScheduler;
use crate::services::runtime::{self, ResponseMode};
use crate::services::{BrowserWindow, ChromeRuntimeSender};
use std::rc::Rc;

pub fn start(config: BridgeConfig) -> Result<()> {
    let window = Rc::new(BrowserWindow::new()?);
    let relay = Rc::new(Relay::new(
        Rc::new(config),
        window.clone(),
        Rc::new(ChromeRuntimeSender),
        Rc::new(BrowserScheduler),
        Rc::new(SystemClock),
    ));

    let for_requests = Rc::clone(&relay);
    runtime::serve_requests(Box::new(move |message: serde_json::Value| {
        // Anything that is not a handshake request belongs to someone else
        let request: HandshakeRequest = serde_json::from_value(message).ok()?;
        match for_requests.handle_request(&request) {
            Ok(response) => serde_json::to_value(response).ok().map(ResponseMode::Now),
            Err(e) => {
                log::error!("Handshake request failed: {}", e);
                None
            }
        }
    }));

    let for_window = Rc::clone(&relay);
    window.on_message(move |origin, data| {
        for_window.handle_window_message(origin, data);
    })?;

    if let Err(e) = relay.install_guard() {
        log::warn!("Navigation guard not installed: {}", e);
    }

    log::info!("Handshake relay ready");
    Ok(())
}
