// chrome.tabs bindings for the popup, dashboard and background contexts

use crate::error::{describe_js, BridgeError, DeliveryError, Result};
use crate::flow::TabLocator;
use crate::services::js;
use crate::transport::{TabId, TabMessenger};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["chrome", "tabs"], js_name = sendMessage)]
    fn send_message(tab_id: i32, message: JsValue) -> js_sys::Promise;

    #[wasm_bindgen(js_namespace = ["chrome", "tabs"])]
    fn query(query_info: JsValue) -> js_sys::Promise;

    #[wasm_bindgen(js_namespace = ["chrome", "tabs"])]
    fn create(create_properties: JsValue) -> js_sys::Promise;
}

#[derive(Deserialize)]
struct Tab {
    id: Option<TabId>,
}

pub struct ChromeTabs;

impl ChromeTabs {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ChromeTabs {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl TabMessenger for ChromeTabs {
    async fn send_to_tab(
        &self,
        tab_id: TabId,
        message: &Value,
    ) -> std::result::Result<Value, DeliveryError> {
        let message = js::to_js(message).map_err(|e| DeliveryError(e.to_string()))?;

        // Rejects with "Receiving end does not exist" until the content script is up
        let response = JsFuture::from(send_message(tab_id, message))
            .await
            .map_err(|e| DeliveryError(describe_js(&e)))?;

        js::from_js(&response).map_err(|e| DeliveryError(e.to_string()))
    }
}

#[async_trait(?Send)]
impl TabLocator for ChromeTabs {
    async fn find_tab(&self, url_pattern: &str) -> Result<Option<TabId>> {
        let info = js::to_js(&json!({ "url": url_pattern }))?;
        let result = JsFuture::from(query(info))
            .await
            .map_err(BridgeError::browser)?;

        let tabs: Vec<Tab> = serde_json::from_value(js::from_js(&result)?)?;
        Ok(tabs.into_iter().find_map(|tab| tab.id))
    }

    async fn create_tab(&self, url: &str) -> Result<TabId> {
        let props = js::to_js(&json!({ "url": url }))?;
        let result = JsFuture::from(create(props))
            .await
            .map_err(BridgeError::browser)?;

        let tab: Tab = serde_json::from_value(js::from_js(&result)?)?;
        tab.id
            .ok_or_else(|| BridgeError::Browser(format!("tab created for {} has no id", url)))
    }
}
