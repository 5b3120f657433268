// Content-script relay running inside the web app's tab.
//
// Extension -> page: opens the auth/payment popup with a fresh token and
// posts `init` to the window namespace once, best effort.
// Page -> extension: forwards window messages from the web app origin onto
// the runtime bus for the router on the extension side.

pub mod browser;
pub mod guard;

use crate::clock::Clock;
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::protocol::{
    HandshakeRequest, HandshakeResponse, OpenedStatus, PaymentRequest, SessionToken,
    WindowMessage,
};
use crate::scheduler::Timer;
use crate::token::generate_token;
use serde_json::{json, Value};
use std::rc::Rc;

pub const POPUP_NAME: &str = "jarvis_handshake";

pub trait HostWindow {
    fn open_popup(&self, url: &str, name: &str, features: &str) -> Result<()>;
    fn post_message(&self, message: &Value, target_origin: &str) -> Result<()>;
    fn inject_script(&self, source: &str) -> Result<()>;
}

/// Outbound side of the extension bus. Delivery is not confirmed.
pub trait RuntimeSender {
    fn send(&self, message: &Value);
}

pub struct Relay {
    config: Rc<BridgeConfig>,
    window: Rc<dyn HostWindow>,
    runtime: Rc<dyn RuntimeSender>,
    timer: Rc<dyn Timer>,
    clock: Rc<dyn Clock>,
}

impl Relay {
    pub fn new(
        config: Rc<BridgeConfig>,
        window: Rc<dyn HostWindow>,
        runtime: Rc<dyn RuntimeSender>,
        timer: Rc<dyn Timer>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            window,
            runtime,
            timer,
            clock,
        }
    }

    pub fn handle_request(&self, request: &HandshakeRequest) -> Result<HandshakeResponse> {
        let token = generate_token(self.clock.as_ref());
        let (url, status) = match request {
            HandshakeRequest::OpenAuth => (self.auth_url(&token)?, OpenedStatus::AuthOpened),
            HandshakeRequest::OpenPayment { data } => {
                (self.payment_url(&token, data)?, OpenedStatus::PaymentOpened)
            }
        };

        log::info!("Opening handshake popup {}", url);
        if let Err(e) = self
            .window
            .open_popup(&url, POPUP_NAME, &self.config.popup_features())
        {
            log::warn!("Handshake popup did not open: {}", e);
        }
        self.schedule_init(token.clone(), self.config.init_post_attempts.max(1));

        Ok(HandshakeResponse { status, token })
    }

    pub fn auth_url(&self, token: &SessionToken) -> Result<String> {
        let mut url = self.config.page_url("auth")?;
        url.query_pairs_mut().append_pair("token", token.as_str());
        Ok(url.into())
    }

    pub fn payment_url(&self, token: &SessionToken, request: &PaymentRequest) -> Result<String> {
        let mut url = self.config.page_url("payment")?;
        url.query_pairs_mut()
            .append_pair("token", token.as_str())
            .append_pair("amount", &request.amount)
            .append_pair("wallet", request.wallet.as_str());
        Ok(url.into())
    }

    // No acknowledgement comes back for `init`; with more than one attempt
    // the same message is simply posted again after the same delay.
    fn schedule_init(&self, token: SessionToken, remaining: u32) {
        let window = Rc::clone(&self.window);
        let timer = Rc::clone(&self.timer);
        let source = self.config.extension_source.clone();
        let delay = self.config.init_delay_ms;

        self.timer.schedule(
            delay,
            Box::new(move || post_init(window, timer, source, delay, token, remaining)),
        );
    }

    /// Returns true when the message was forwarded to the extension bus.
    pub fn handle_window_message(&self, origin: &str, data: &Value) -> bool {
        if origin != self.config.origin() {
            log::trace!("Ignoring window message from {}", origin);
            return false;
        }
        if data.get("source").and_then(Value::as_str) != Some(self.config.webapp_source.as_str())
        {
            return false;
        }
        let Some(kind) = data.get("type").and_then(Value::as_str) else {
            return false;
        };

        log::info!("Relaying {} from web app", kind);
        self.runtime.send(&json!({
            "type": kind,
            "data": data.get("data").cloned().unwrap_or(Value::Null),
            "timestamp": self.clock.now_iso(),
        }));
        true
    }

    pub fn install_guard(&self) -> Result<()> {
        let home = self.config.base()?;
        self.window.inject_script(&guard::guard_script(home.as_str()))
    }
}

fn post_init(
    window: Rc<dyn HostWindow>,
    timer: Rc<dyn Timer>,
    source: String,
    delay: u32,
    token: SessionToken,
    remaining: u32,
) {
    let message = WindowMessage::init(&source, token.clone());
    match serde_json::to_value(&message) {
        Ok(message) => {
            if let Err(e) = window.post_message(&message, "*") {
                log::warn!("init post failed: {}", e);
            }
        }
        Err(e) => log::warn!("init message not encodable: {}", e),
    }

    if remaining > 1 {
        let next = Rc::clone(&timer);
        next.schedule(
            delay,
            Box::new(move || post_init(window, timer, source, delay, token, remaining - 1)),
        );
    }
}
