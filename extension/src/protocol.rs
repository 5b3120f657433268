// Wire shapes shared by the popup/dashboard, the content-script relay
// and the web app. Field names follow the JSON the web app speaks.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SessionToken(pub String);

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Wallet {
    #[default]
    Keplr,
    Leap,
}

impl Wallet {
    pub fn as_str(&self) -> &'static str {
        match self {
            Wallet::Keplr => "keplr",
            Wallet::Leap => "leap",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Wallet::Keplr => "Keplr",
            Wallet::Leap => "Leap",
        }
    }
}

/// Extension -> content script.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HandshakeRequest {
    OpenAuth,
    OpenPayment { data: PaymentRequest },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PaymentRequest {
    pub amount: String,
    pub wallet: Wallet,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OpenedStatus {
    AuthOpened,
    PaymentOpened,
}

/// Content script -> extension, answered synchronously.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HandshakeResponse {
    pub status: OpenedStatus,
    pub token: SessionToken,
}

/// The fixed set of inbound event names the router knows about.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    WalletConnected,
    PaymentResult,
}

impl EventKind {
    pub const ALL: [EventKind; 2] = [EventKind::WalletConnected, EventKind::PaymentResult];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::WalletConnected => "wallet_connected",
            EventKind::PaymentResult => "payment_result",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

/// `{type, data, timestamp}` as relayed onto the extension bus.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundEvent {
    pub kind: EventKind,
    pub data: Value,
    pub timestamp: Option<String>,
}

impl InboundEvent {
    /// None for anything that is not one of the known event types.
    pub fn parse(message: &Value) -> Option<Self> {
        let kind = EventKind::from_name(message.get("type")?.as_str()?)?;
        Some(Self {
            kind,
            data: message.get("data").cloned().unwrap_or(Value::Null),
            timestamp: message
                .get("timestamp")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Failed,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub status: ResultStatus,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Payload of `wallet_connected`; the web app sends an open object so
/// everything is optional.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct WalletConnected {
    pub status: Option<ResultStatus>,
    pub address: Option<String>,
    pub token: Option<String>,
    pub expires_at: Option<i64>,
    pub wallet: Option<Wallet>,
    pub error: Option<String>,
}

/// Window-level messages exchanged with the web app page.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WindowMessage {
    pub source: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub token: SessionToken,
}

impl WindowMessage {
    pub fn init(source: &str, token: SessionToken) -> Self {
        Self {
            source: source.to_string(),
            kind: "init".to_string(),
            token,
        }
    }
}
