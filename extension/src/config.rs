use crate::error::{BridgeError, Result};
use crate::transport::RetryPolicy;
use serde::Deserialize;
use url::Url;

const BUNDLED_CONFIG: &str = include_str!("../bridge.toml");

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Origin of the web app that runs the auth and payment pages
    pub base_url: String,

    // `source` tags on window messages, ours and the web app's
    pub extension_source: String,
    pub webapp_source: String,

    pub popup_width: u32,
    pub popup_height: u32,

    pub init_delay_ms: u32,
    /// How many times the `init` message is posted (1 = fire once, no retry)
    pub init_post_attempts: u32,

    pub tab_warmup_ms: u32,
    pub retry: RetryPolicy,
    pub success_display_ms: u32,

    /// None keeps a handshake in `processing` until a result arrives
    pub result_timeout_ms: Option<u32>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            extension_source: "my-extension".to_string(),
            webapp_source: "my-webapp".to_string(),
            popup_width: 450,
            popup_height: 600,
            init_delay_ms: 1000,
            init_post_attempts: 1,
            tab_warmup_ms: 2000,
            retry: RetryPolicy::default(),
            success_display_ms: 3000,
            result_timeout_ms: None,
        }
    }
}

impl BridgeConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: BridgeConfig =
            toml::from_str(source).map_err(|e| BridgeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Config shipped inside the extension bundle, or defaults if it is broken.
    pub fn bundled() -> Self {
        match Self::from_toml_str(BUNDLED_CONFIG) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Bundled bridge config rejected, using defaults: {}", e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url)?;
        if url.cannot_be_a_base() {
            return Err(BridgeError::Config(format!(
                "base_url {} cannot be used as a base",
                self.base_url
            )));
        }
        if self.popup_width == 0 || self.popup_height == 0 {
            return Err(BridgeError::Config("popup size must be non-zero".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(BridgeError::Config("retry.max_attempts must be at least 1".into()));
        }
        Ok(())
    }

    /// `scheme://host[:port]` exactly as the browser reports `event.origin`.
    pub fn origin(&self) -> String {
        match Url::parse(&self.base_url) {
            Ok(url) => url.origin().ascii_serialization(),
            Err(_) => self.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> Result<Url> {
        Ok(Url::parse(&self.base_url)?)
    }

    /// `{base_url}/{page}`, keeping any path already in `base_url`.
    pub fn page_url(&self, page: &str) -> Result<Url> {
        let mut url = self.base()?;
        url.path_segments_mut()
            .map_err(|_| {
                BridgeError::Config(format!("base_url {} has no path", self.base_url))
            })?
            .pop_if_empty()
            .push(page);
        Ok(url)
    }

    /// Pattern for `chrome.tabs.query` that matches any page of the web app.
    pub fn tab_url_pattern(&self) -> String {
        format!("{}/*", self.origin())
    }

    pub fn popup_features(&self) -> String {
        format!("width={},height={}", self.popup_width, self.popup_height)
    }
}
