// Extension-side handshake controllers (payment, wallet auth)

pub mod auth;
pub mod payment;

pub use auth::{AuthFlow, AuthStatus};
pub use payment::{PaymentFlow, PaymentSnapshot, PaymentStatus};

use crate::clock::Clock;
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::scheduler::{Sleeper, Timer};
use crate::services::KeyValueStore;
use crate::transport::{TabId, TabMessenger};
use async_trait::async_trait;
use std::rc::Rc;

#[async_trait(?Send)]
pub trait TabLocator {
    async fn find_tab(&self, url_pattern: &str) -> Result<Option<TabId>>;
    async fn create_tab(&self, url: &str) -> Result<TabId>;
}

/// Collaborators shared by the flows.
#[derive(Clone)]
pub struct FlowContext {
    pub messenger: Rc<dyn TabMessenger>,
    pub tabs: Rc<dyn TabLocator>,
    pub store: Rc<dyn KeyValueStore>,
    pub sleeper: Rc<dyn Sleeper>,
    pub timer: Rc<dyn Timer>,
    pub clock: Rc<dyn Clock>,
}

impl FlowContext {
    /// Tab showing the web app, opened if needed. A new tab gets
    /// `tab_warmup_ms` to load before its content script is messaged.
    pub async fn web_app_tab(&self, config: &BridgeConfig) -> Result<TabId> {
        if let Some(tab_id) = self.tabs.find_tab(&config.tab_url_pattern()).await? {
            return Ok(tab_id);
        }

        let tab_id = self.tabs.create_tab(&config.base_url).await?;
        log::info!("Opened web app tab {}, waiting for it to load", tab_id);
        self.sleeper.sleep_ms(config.tab_warmup_ms).await;
        Ok(tab_id)
    }
}
