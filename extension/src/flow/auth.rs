// Wallet connection through the web app's /auth popup.
// A successful `wallet_connected` leaves a session in storage that the
// popup restores on its next open.

use super::FlowContext;
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::protocol::{
    EventKind, HandshakeRequest, HandshakeResponse, InboundEvent, OpenedStatus, ResultStatus,
    Wallet, WalletConnected,
};
use crate::services::storage::{self, keys};
use crate::transport::send_handshake;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq)]
pub enum AuthStatus {
    Idle,
    Connecting,
    Connected { address: Option<String> },
    Failed { message: String },
}

type Listener = Rc<dyn Fn(&AuthStatus)>;

struct AuthState {
    status: AuthStatus,
    attempt: u64,
}

#[derive(Clone)]
pub struct AuthFlow {
    ctx: FlowContext,
    config: Rc<BridgeConfig>,
    state: Rc<RefCell<AuthState>>,
    listener: Rc<RefCell<Option<Listener>>>,
}

impl AuthFlow {
    pub fn new(ctx: FlowContext, config: Rc<BridgeConfig>) -> Self {
        Self {
            ctx,
            config,
            state: Rc::new(RefCell::new(AuthState {
                status: AuthStatus::Idle,
                attempt: 0,
            })),
            listener: Rc::new(RefCell::new(None)),
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&AuthStatus) + 'static) {
        *self.listener.borrow_mut() = Some(Rc::new(listener));
    }

    pub fn status(&self) -> AuthStatus {
        self.state.borrow().status.clone()
    }

    /// Picks up a stored session. Expired sessions are removed.
    pub async fn restore(&self) -> Result<bool> {
        let store = self.ctx.store.as_ref();
        let token: Option<String> = storage::load(store, keys::AUTH_TOKEN).await?;
        if token.is_none() {
            return Ok(false);
        }

        let expiry: Option<i64> = storage::load(store, keys::TOKEN_EXPIRY).await?;
        if let Some(expires_at) = expiry {
            if expires_at <= self.ctx.clock.now_millis() as i64 {
                log::info!("Stored wallet session expired, clearing it");
                self.clear_session().await?;
                return Ok(false);
            }
        }

        let address: Option<String> = storage::load(store, keys::WALLET_ADDRESS).await?;
        self.set_status(AuthStatus::Connected { address });
        Ok(true)
    }

    pub async fn connect(&self, wallet: Wallet) -> AuthStatus {
        let attempt = {
            let mut state = self.state.borrow_mut();
            state.attempt += 1;
            state.attempt
        };
        self.set_status(AuthStatus::Connecting);
        log::info!("Connecting {} wallet", wallet.label());

        if let Err(e) = storage::save(self.ctx.store.as_ref(), keys::WALLET_PREFERENCE, &wallet).await
        {
            log::warn!("Could not persist wallet preference: {}", e);
        }

        let outcome: Result<HandshakeResponse> = async {
            let tab_id = self.ctx.web_app_tab(&self.config).await?;
            send_handshake(
                self.ctx.messenger.as_ref(),
                self.ctx.sleeper.as_ref(),
                tab_id,
                &HandshakeRequest::OpenAuth,
                self.config.retry,
            )
            .await
        }
        .await;

        if !self.is_pending(attempt) {
            return self.status();
        }
        match outcome {
            Ok(response) if response.status == OpenedStatus::AuthOpened => {
                log::info!("Wallet auth window opened (token {})", response.token);
                self.arm_timeout(attempt);
            }
            Ok(_) => self.set_status(AuthStatus::Failed {
                message: "Failed to open wallet connection window".to_string(),
            }),
            Err(e) => {
                log::error!("Wallet auth request failed: {}", e);
                self.set_status(AuthStatus::Failed {
                    message: format!("Could not reach the wallet page: {}", e),
                });
            }
        }
        self.status()
    }

    /// Router callback. Persists the session before reporting it connected.
    pub async fn handle_event(&self, event: &InboundEvent) -> Result<()> {
        if event.kind != EventKind::WalletConnected {
            return Ok(());
        }

        let connected: WalletConnected =
            serde_json::from_value(event.data.clone()).unwrap_or_else(|e| {
                log::warn!("Unreadable wallet_connected payload: {}", e);
                WalletConnected::default()
            });

        if connected.status == Some(ResultStatus::Failed) {
            let message = connected
                .error
                .unwrap_or_else(|| "Wallet connection failed".to_string());
            self.set_status(AuthStatus::Failed { message });
            return Ok(());
        }

        if let Err(e) = self.store_session(&connected).await {
            self.set_status(AuthStatus::Failed {
                message: format!("Could not save wallet session: {}", e),
            });
            return Err(e);
        }

        log::info!("Wallet connected: {:?}", connected.address);
        self.set_status(AuthStatus::Connected {
            address: connected.address,
        });
        Ok(())
    }

    pub async fn logout(&self) -> Result<()> {
        self.clear_session().await?;
        self.state.borrow_mut().attempt += 1;
        self.set_status(AuthStatus::Idle);
        log::info!("Logged out");
        Ok(())
    }

    async fn store_session(&self, connected: &WalletConnected) -> Result<()> {
        let store = self.ctx.store.as_ref();
        if let Some(token) = &connected.token {
            storage::save(store, keys::AUTH_TOKEN, token).await?;
        }
        if let Some(address) = &connected.address {
            storage::save(store, keys::WALLET_ADDRESS, address).await?;
        }
        if let Some(expires_at) = connected.expires_at {
            storage::save(store, keys::TOKEN_EXPIRY, &expires_at).await?;
        }
        if let Some(wallet) = connected.wallet {
            storage::save(store, keys::WALLET_PREFERENCE, &wallet).await?;
        }
        Ok(())
    }

    async fn clear_session(&self) -> Result<()> {
        let store = self.ctx.store.as_ref();
        for key in [keys::AUTH_TOKEN, keys::WALLET_ADDRESS, keys::TOKEN_EXPIRY] {
            store.remove(key).await?;
        }
        Ok(())
    }

    fn arm_timeout(&self, attempt: u64) {
        let Some(timeout_ms) = self.config.result_timeout_ms else {
            return;
        };
        let flow = self.clone();
        self.ctx.timer.schedule(
            timeout_ms,
            Box::new(move || {
                if flow.is_pending(attempt) {
                    flow.set_status(AuthStatus::Failed {
                        message: "Timed out waiting for the wallet".to_string(),
                    });
                }
            }),
        );
    }

    fn is_pending(&self, attempt: u64) -> bool {
        let state = self.state.borrow();
        state.attempt == attempt && state.status == AuthStatus::Connecting
    }

    fn set_status(&self, status: AuthStatus) {
        self.state.borrow_mut().status = status.clone();
        let listener = self.listener.borrow().clone();
        if let Some(listener) = listener {
            listener(&status);
        }
    }
}
