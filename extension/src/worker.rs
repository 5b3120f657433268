// Requests served by the background worker: storage defaults on install,
// dashboard stats, and opening the full-page dashboard.

use crate::error::Result;
use crate::flow::TabLocator;
use crate::services::storage::{self, keys, KeyValueStore};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const MAIN_PAGE: &str = "index.html#home";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Stats {
    pub active: u32,
    pub pending: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<u32>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum BackgroundRequest {
    GetStats,
    UpdateStats { stats: Stats },
    OpenMainPage,
}

pub async fn handle_install(store: &dyn KeyValueStore) -> Result<()> {
    storage::save(store, keys::IS_ENABLED, &true).await?;
    storage::save(store, keys::STATS, &Stats::default()).await?;
    Ok(())
}

pub async fn handle_request(
    store: &dyn KeyValueStore,
    tabs: &dyn TabLocator,
    request: BackgroundRequest,
    main_page_url: &str,
) -> Result<Value> {
    match request {
        BackgroundRequest::GetStats => {
            let stats: Stats = storage::load(store, keys::STATS).await?.unwrap_or_default();
            Ok(serde_json::to_value(stats)?)
        }
        BackgroundRequest::UpdateStats { stats } => {
            storage::save(store, keys::STATS, &stats).await?;
            Ok(json!({ "success": true }))
        }
        BackgroundRequest::OpenMainPage => {
            open_main_page(tabs, main_page_url).await?;
            Ok(json!({ "success": true }))
        }
    }
}

pub async fn open_main_page(tabs: &dyn TabLocator, main_page_url: &str) -> Result<()> {
    let tab_id = tabs.create_tab(main_page_url).await?;
    log::info!("Dashboard opened in tab {}", tab_id);
    Ok(())
}
