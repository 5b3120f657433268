// chrome.runtime messaging: the process-wide extension bus

use crate::error::describe_js;
use crate::relay::RuntimeSender;
use crate::router::{BusListener, ListenerId, MessageBus};
use crate::services::js;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["chrome", "runtime"], js_name = sendMessage)]
    fn send_message(message: JsValue) -> js_sys::Promise;

    /// Absolute URL of a file packaged with the extension
    #[wasm_bindgen(js_namespace = ["chrome", "runtime"], js_name = getURL)]
    pub fn get_url(path: &str) -> String;

    #[wasm_bindgen(js_namespace = ["chrome", "runtime", "onMessage"], js_name = addListener)]
    fn add_listener(callback: &js_sys::Function);

    #[wasm_bindgen(js_namespace = ["chrome", "runtime", "onMessage"], js_name = removeListener)]
    fn remove_listener(callback: &js_sys::Function);
}

type OnMessage = Closure<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>;

/// Handler for request/response traffic. Returning `Some` answers through
/// `sendResponse`; `None` leaves the message to other listeners.
pub type RequestHandler = Box<dyn Fn(Value) -> Option<ResponseMode>>;

pub enum ResponseMode {
    Now(Value),
    /// Keep the channel open; the handler calls the responder later
    Later(Box<dyn FnOnce(Responder)>),
}

pub struct Responder(js_sys::Function);

impl Responder {
    pub fn send(self, value: &Value) {
        match js::to_js(value) {
            Ok(response) => {
                if let Err(e) = self.0.call1(&JsValue::NULL, &response) {
                    log::warn!("sendResponse failed: {}", describe_js(&e));
                }
            }
            Err(e) => log::warn!("Could not encode response: {}", e),
        }
    }
}

/// Installs a listener that lives as long as the page or worker.
pub fn serve_requests(handler: RequestHandler) {
    let callback: OnMessage = Closure::wrap(Box::new(
        move |message: JsValue, _sender: JsValue, send_response: JsValue| -> JsValue {
            let Ok(message) = js::from_js(&message) else {
                return JsValue::FALSE;
            };
            let responder = Responder(send_response.unchecked_into());
            match handler(message) {
                Some(ResponseMode::Now(value)) => {
                    responder.send(&value);
                    JsValue::FALSE
                }
                Some(ResponseMode::Later(reply)) => {
                    reply(responder);
                    JsValue::TRUE
                }
                None => JsValue::FALSE,
            }
        },
    )
        as Box<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>);

    add_listener(callback.as_ref().unchecked_ref());
    callback.forget();
}

/// `chrome.runtime.onMessage` as a [`MessageBus`].
#[derive(Default)]
pub struct ChromeRuntimeBus {
    next_id: Cell<ListenerId>,
    listeners: RefCell<HashMap<ListenerId, OnMessage>>,
}

impl ChromeRuntimeBus {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageBus for ChromeRuntimeBus {
    fn add_listener(&self, listener: BusListener) -> ListenerId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let callback: OnMessage = Closure::wrap(Box::new(
            move |message: JsValue, _sender: JsValue, _send_response: JsValue| -> JsValue {
                match js::from_js(&message) {
                    Ok(message) => listener(&message),
                    Err(e) => log::debug!("Dropping undecodable runtime message: {}", e),
                }
                JsValue::FALSE
            },
        )
            as Box<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>);

        add_listener(callback.as_ref().unchecked_ref());
        self.listeners.borrow_mut().insert(id, callback);
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        if let Some(callback) = self.listeners.borrow_mut().remove(&id) {
            remove_listener(callback.as_ref().unchecked_ref());
        }
    }
}

/// Fire-and-forget `chrome.runtime.sendMessage` from the content script.
pub struct ChromeRuntimeSender;

impl RuntimeSender for ChromeRuntimeSender {
    fn send(&self, message: &Value) {
        let message = match js::to_js(message) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("Could not encode runtime message: {}", e);
                return;
            }
        };
        let promise = send_message(message);
        wasm_bindgen_futures::spawn_local(async move {
            // Rejects when no extension page is open to receive it
            if let Err(e) = JsFuture::from(promise).await {
                log::debug!("Runtime message not delivered: {}", describe_js(&e));
            }
        });
    }
}
