// Chrome Storage API Integration
// Values are stored as JSON, keys match what the dashboard already uses

use crate::error::{BridgeError, Result};
use crate::services::js;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["chrome", "storage", "local"])]
    fn get(keys: JsValue) -> js_sys::Promise;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "local"])]
    fn set(items: JsValue) -> js_sys::Promise;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "local"])]
    fn remove(keys: JsValue) -> js_sys::Promise;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "local"])]
    fn clear() -> js_sys::Promise;
}

pub mod keys {
    pub const IS_ENABLED: &str = "isEnabled";
    pub const STATS: &str = "stats";
    pub const WALLET_PREFERENCE: &str = "walletPreference";
    pub const AUTH_TOKEN: &str = "authToken";
    pub const WALLET_ADDRESS: &str = "walletAddress";
    pub const TOKEN_EXPIRY: &str = "tokenExpiry";
}

/// Async key-value capability. Missing keys read as `None`.
#[async_trait(?Send)]
pub trait KeyValueStore {
    async fn get_raw(&self, key: &str) -> Result<Option<Value>>;
    async fn set_raw(&self, key: &str, value: Value) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

pub async fn load<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get_raw(key).await? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
    }
}

pub async fn save<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    store.set_raw(key, serde_json::to_value(value)?).await
}

/// `chrome.storage.local`
pub struct ChromeStorage;

impl ChromeStorage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ChromeStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn storage_err(err: JsValue) -> BridgeError {
    BridgeError::Storage(crate::error::describe_js(&err))
}

#[async_trait(?Send)]
impl KeyValueStore for ChromeStorage {
    async fn get_raw(&self, key: &str) -> Result<Option<Value>> {
        let keys = js_sys::Array::new();
        keys.push(&key.into());

        let result = JsFuture::from(get(keys.into())).await.map_err(storage_err)?;
        let value = js_sys::Reflect::get(&result, &key.into()).map_err(storage_err)?;

        if value.is_undefined() || value.is_null() {
            return Ok(None);
        }
        Ok(Some(js::from_js(&value)?))
    }

    async fn set_raw(&self, key: &str, value: Value) -> Result<()> {
        let obj = js_sys::Object::new();
        js_sys::Reflect::set(&obj, &key.into(), &js::to_js(&value)?).map_err(storage_err)?;

        JsFuture::from(set(obj.into())).await.map_err(storage_err)?;
        log::debug!("Stored {}", key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let keys = js_sys::Array::new();
        keys.push(&key.into());
        JsFuture::from(remove(keys.into())).await.map_err(storage_err)?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        log::info!("Clearing storage...");
        JsFuture::from(clear()).await.map_err(storage_err)?;
        log::info!("Storage cleared");
        Ok(())
    }
}
