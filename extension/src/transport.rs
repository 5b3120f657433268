// One-shot messages to a content script in a specific tab.
// The script may not be injected yet right after the tab is created,
// so delivery failures are retried on a fixed delay.

use crate::error::{BridgeError, DeliveryError, Result};
use crate::protocol::{HandshakeRequest, HandshakeResponse};
use crate::scheduler::Sleeper;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

pub type TabId = i32;

#[async_trait(?Send)]
pub trait TabMessenger {
    async fn send_to_tab(
        &self,
        tab_id: TabId,
        message: &Value,
    ) -> std::result::Result<Value, DeliveryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub delay_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay_ms: 500,
        }
    }
}

pub async fn send_message_with_retry(
    messenger: &dyn TabMessenger,
    sleeper: &dyn Sleeper,
    tab_id: TabId,
    message: &Value,
    policy: RetryPolicy,
) -> Result<Value> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match messenger.send_to_tab(tab_id, message).await {
            Ok(response) => return Ok(response),
            Err(e) if attempt < max_attempts => {
                log::warn!(
                    "Retrying sendMessage to tab {}... attempt {}, error: {}",
                    tab_id,
                    attempt,
                    e
                );
                sleeper.sleep_ms(policy.delay_ms).await;
            }
            Err(e) => {
                return Err(BridgeError::RetriesExhausted {
                    attempts: max_attempts,
                    last_error: e,
                })
            }
        }
    }
}

/// Sends a handshake request and expects an `*_opened` answer back.
pub async fn send_handshake(
    messenger: &dyn TabMessenger,
    sleeper: &dyn Sleeper,
    tab_id: TabId,
    request: &HandshakeRequest,
    policy: RetryPolicy,
) -> Result<HandshakeResponse> {
    let message = serde_json::to_value(request)?;
    let response = send_message_with_retry(messenger, sleeper, tab_id, &message, policy).await?;

    serde_json::from_value(response.clone())
        .map_err(|_| BridgeError::UnexpectedResponse(response.to_string()))
}
