// Payment handshake as driven from the dashboard's payment dropdown.
//
//   idle -> processing -> success -> (after success_display_ms) idle
//                      \-> failed  -> idle on the next input edit
//
// Only local actions and `payment_result` events move the status. Results
// carry no token, so whichever attempt is current when one arrives is the
// one it resolves.

use super::FlowContext;
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::protocol::{
    EventKind, HandshakeRequest, HandshakeResponse, InboundEvent, OpenedStatus, PaymentRequest,
    PaymentResult, ResultStatus, Wallet,
};
use crate::services::storage::{self, keys};
use crate::transport::send_handshake;
use std::cell::RefCell;
use std::rc::Rc;

pub const INVALID_AMOUNT: &str = "Please enter a valid amount";
const DEFAULT_FAILURE: &str = "Payment failed";

#[derive(Clone, Debug, PartialEq)]
pub enum PaymentStatus {
    Idle,
    Processing,
    Success { tx_hash: Option<String> },
    Failed { message: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PaymentSnapshot {
    pub status: PaymentStatus,
    pub amount: String,
    pub wallet: Wallet,
    /// Whether the dropdown is expanded
    pub open: bool,
}

type Listener = Rc<dyn Fn(&PaymentSnapshot)>;

struct PaymentState {
    snapshot: PaymentSnapshot,
    attempt: u64,
}

#[derive(Clone)]
pub struct PaymentFlow {
    ctx: FlowContext,
    config: Rc<BridgeConfig>,
    state: Rc<RefCell<PaymentState>>,
    listener: Rc<RefCell<Option<Listener>>>,
}

impl PaymentFlow {
    pub fn new(ctx: FlowContext, config: Rc<BridgeConfig>) -> Self {
        Self {
            ctx,
            config,
            state: Rc::new(RefCell::new(PaymentState {
                snapshot: PaymentSnapshot {
                    status: PaymentStatus::Idle,
                    amount: String::new(),
                    wallet: Wallet::default(),
                    open: false,
                },
                attempt: 0,
            })),
            listener: Rc::new(RefCell::new(None)),
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&PaymentSnapshot) + 'static) {
        *self.listener.borrow_mut() = Some(Rc::new(listener));
    }

    pub fn snapshot(&self) -> PaymentSnapshot {
        self.state.borrow().snapshot.clone()
    }

    pub fn status(&self) -> PaymentStatus {
        self.state.borrow().snapshot.status.clone()
    }

    pub fn open(&self) {
        self.update(|state| state.snapshot.open = true);
    }

    /// Collapses the dropdown. In-flight sends are not cancelled; their
    /// outcome is dropped because the attempt is no longer current.
    pub fn close(&self) {
        self.update(|state| {
            state.snapshot.open = false;
            state.snapshot.status = PaymentStatus::Idle;
        });
    }

    pub fn set_amount(&self, amount: impl Into<String>) {
        let amount = amount.into();
        self.update(|state| {
            state.snapshot.amount = amount;
            if matches!(state.snapshot.status, PaymentStatus::Failed { .. }) {
                state.snapshot.status = PaymentStatus::Idle;
            }
        });
    }

    pub fn select_wallet(&self, wallet: Wallet) {
        self.update(|state| state.snapshot.wallet = wallet);
    }

    pub async fn submit(&self) -> PaymentStatus {
        let (amount, wallet) = {
            let state = self.state.borrow();
            (state.snapshot.amount.trim().to_string(), state.snapshot.wallet)
        };

        if !is_valid_amount(&amount) {
            self.update(|state| {
                state.snapshot.status = PaymentStatus::Failed {
                    message: INVALID_AMOUNT.to_string(),
                }
            });
            return self.status();
        }

        let attempt = self.update(|state| {
            state.attempt += 1;
            state.snapshot.status = PaymentStatus::Processing;
            state.attempt
        });
        log::info!("Payment attempt {}: {} via {}", attempt, amount, wallet.label());

        if let Err(e) = storage::save(self.ctx.store.as_ref(), keys::WALLET_PREFERENCE, &wallet).await
        {
            log::warn!("Could not persist wallet preference: {}", e);
        }

        let outcome = self.request_payment(amount, wallet).await;
        if !self.is_pending(attempt) {
            log::info!("Payment attempt {} superseded, dropping its outcome", attempt);
            return self.status();
        }

        match outcome {
            Ok(response) if response.status == OpenedStatus::PaymentOpened => {
                log::info!("Payment window opened (token {})", response.token);
                self.arm_timeout(attempt);
            }
            Ok(response) => {
                log::warn!("Unexpected handshake answer: {:?}", response.status);
                self.fail(attempt, "Failed to open payment window".to_string());
            }
            Err(e) => {
                log::error!("Payment request failed: {}", e);
                self.fail(attempt, format!("Could not reach the payment page: {}", e));
            }
        }
        self.status()
    }

    async fn request_payment(&self, amount: String, wallet: Wallet) -> Result<HandshakeResponse> {
        let tab_id = self.ctx.web_app_tab(&self.config).await?;
        let request = HandshakeRequest::OpenPayment {
            data: PaymentRequest { amount, wallet },
        };
        send_handshake(
            self.ctx.messenger.as_ref(),
            self.ctx.sleeper.as_ref(),
            tab_id,
            &request,
            self.config.retry,
        )
        .await
    }

    /// Router callback. Events other than `payment_result` are not ours.
    pub fn handle_event(&self, event: &InboundEvent) {
        if event.kind != EventKind::PaymentResult {
            return;
        }

        let result: PaymentResult = match serde_json::from_value(event.data.clone()) {
            Ok(result) => result,
            Err(e) => {
                log::warn!("Unreadable payment_result treated as failure: {}", e);
                PaymentResult {
                    status: ResultStatus::Failed,
                    tx_hash: None,
                    error: None,
                }
            }
        };

        match result.status {
            ResultStatus::Success => {
                log::info!("Payment succeeded: {:?}", result.tx_hash);
                let attempt = self.update(|state| {
                    state.snapshot.status = PaymentStatus::Success {
                        tx_hash: result.tx_hash,
                    };
                    state.snapshot.amount.clear();
                    state.attempt
                });

                let flow = self.clone();
                self.ctx.timer.schedule(
                    self.config.success_display_ms,
                    Box::new(move || flow.finish_success(attempt)),
                );
            }
            ResultStatus::Failed => {
                let message = result.error.unwrap_or_else(|| DEFAULT_FAILURE.to_string());
                log::warn!("Payment failed: {}", message);
                self.update(|state| state.snapshot.status = PaymentStatus::Failed { message });
            }
        }
    }

    /// Truncated hash of the last successful payment, for display.
    pub fn display_hash(&self) -> Option<String> {
        match &self.state.borrow().snapshot.status {
            PaymentStatus::Success {
                tx_hash: Some(hash),
            } => Some(truncate_hash(hash)),
            _ => None,
        }
    }

    fn finish_success(&self, attempt: u64) {
        let done = {
            let state = self.state.borrow();
            state.attempt == attempt
                && matches!(state.snapshot.status, PaymentStatus::Success { .. })
        };
        if done {
            self.update(|state| {
                state.snapshot.status = PaymentStatus::Idle;
                state.snapshot.open = false;
            });
        }
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
                    log::warn!("No payment result after {} ms", timeout_ms);
                    flow.fail(attempt, "Timed out waiting for the payment result".to_string());
                }
            }),
        );
    }

    fn is_pending(&self, attempt: u64) -> bool {
        let state = self.state.borrow();
        state.attempt == attempt && state.snapshot.status == PaymentStatus::Processing
    }

    fn fail(&self, attempt: u64, message: String) {
        if self.is_pending(attempt) {
            self.update(|state| state.snapshot.status = PaymentStatus::Failed { message });
        }
    }

    fn update<R>(&self, change: impl FnOnce(&mut PaymentState) -> R) -> R {
        let (result, snapshot) = {
            let mut state = self.state.borrow_mut();
            let result = change(&mut state);
            (result, state.snapshot.clone())
        };
        let listener = self.listener.borrow().clone();
        if let Some(listener) = listener {
            listener(&snapshot);
        }
        result
    }
}

pub fn is_valid_amount(amount: &str) -> bool {
    amount
        .trim()
        .parse::<f64>()
        .map(|value| value.is_finite() && value > 0.0)
        .unwrap_or(false)
}

/// `ABC12345...67890XYZ` for anything longer than 16 characters.
pub fn truncate_hash(hash: &str) -> String {
    let chars: Vec<char> = hash.chars().collect();
    if chars.len() <= 16 {
        return hash.to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 8..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeliveryError;
    use crate::testing::TestEnv;
    use futures::executor::{block_on, LocalPool};
    use futures::task::LocalSpawnExt;
    use serde_json::{json, Value};

    const HASH: &str = "ABC1234567890DEF1234567890XYZ";

    fn opened() -> std::result::Result<Value, DeliveryError> {
        Ok(json!({"status": "payment_opened", "token": "tok"}))
    }

    fn result_event(data: Value) -> InboundEvent {
        InboundEvent {
            kind: EventKind::PaymentResult,
            data,
            timestamp: None,
        }
    }

    fn recorded(flow: &PaymentFlow) -> Rc<RefCell<Vec<PaymentStatus>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        flow.subscribe(move |snapshot| {
            let mut seen = sink.borrow_mut();
            if seen.last() != Some(&snapshot.status) {
                seen.push(snapshot.status.clone());
            }
        });
        seen
    }

    #[test]
    fn test_invalid_amount_fails_without_messaging() {
        for amount in ["0", "-5", "abc", "", "   ", "NaN", "inf", "0.0"] {
            let env = TestEnv::new();
            let flow = env.payment_flow();
            flow.set_amount(amount);

            let status = block_on(flow.submit());

            assert_eq!(
                status,
                PaymentStatus::Failed {
                    message: INVALID_AMOUNT.to_string()
                },
                "amount {:?}",
                amount
            );
            assert_eq!(env.messenger.attempts(), 0);
            assert!(env.tabs.queries().is_empty());
            assert_eq!(env.store.raw(keys::WALLET_PREFERENCE), None);
        }
    }

    #[test]
    fn test_success_then_revert_to_idle() {
        let env = TestEnv::new();
        env.tabs.add_existing(7);
        env.messenger.push(opened());
        let flow = env.payment_flow();
        let seen = recorded(&flow);

        flow.open();
        flow.set_amount("10");
        flow.select_wallet(Wallet::Leap);
        assert_eq!(block_on(flow.submit()), PaymentStatus::Processing);

        assert_eq!(env.store.raw(keys::WALLET_PREFERENCE), Some(json!("leap")));
        assert_eq!(
            env.messenger.sent(),
            vec![(
                7,
                json!({"action": "open_payment", "data": {"amount": "10", "wallet": "leap"}})
            )]
        );

        flow.handle_event(&result_event(json!({"status": "success", "txHash": HASH})));
        let snapshot = flow.snapshot();
        assert_eq!(
            snapshot.status,
            PaymentStatus::Success {
                tx_hash: Some(HASH.to_string())
            }
        );
        assert_eq!(snapshot.amount, "");
        assert_eq!(flow.display_hash().as_deref(), Some("ABC12345...67890XYZ"));

        env.timer.advance(2999);
        assert!(matches!(flow.status(), PaymentStatus::Success { .. }));
        assert!(flow.snapshot().open);

        env.timer.advance(1);
        assert_eq!(flow.status(), PaymentStatus::Idle);
        assert!(!flow.snapshot().open);

        assert_eq!(
            *seen.borrow(),
            vec![
                PaymentStatus::Idle,
                PaymentStatus::Processing,
                PaymentStatus::Success {
                    tx_hash: Some(HASH.to_string())
                },
                PaymentStatus::Idle,
            ]
        );
    }

    #[test]
    fn test_retries_exhausted_fails() {
        let env = TestEnv::new();
        env.tabs.add_existing(1);
        let flow = env.payment_flow();
        flow.set_amount("2.5");

        let status = block_on(flow.submit());

        match status {
            PaymentStatus::Failed { message } => {
                assert!(message.contains("failed after 5 retries"), "{}", message)
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(env.messenger.attempts(), 5);
        assert_eq!(env.sleeper.delays(), vec![500; 4]);
    }

    #[test]
    fn test_created_tab_gets_warmup_before_send() {
        let env = TestEnv::new();
        env.messenger.push(opened());
        let flow = env.payment_flow();
        flow.set_amount("1");

        assert_eq!(block_on(flow.submit()), PaymentStatus::Processing);
        assert_eq!(env.tabs.created().len(), 1);
        assert_eq!(env.sleeper.delays(), vec![2000]);
        assert_eq!(env.messenger.sent()[0].0, env.tabs.created_ids()[0]);
    }

    #[test]
    fn test_non_opened_answer_fails() {
        let env = TestEnv::new();
        env.tabs.add_existing(1);
        env.messenger
            .push(Ok(json!({"status": "auth_opened", "token": "tok"})));
        let flow = env.payment_flow();
        flow.set_amount("1");

        assert_eq!(
            block_on(flow.submit()),
            PaymentStatus::Failed {
                message: "Failed to open payment window".to_string()
            }
        );
    }

    #[test]
    fn test_remote_failure_and_recovery_on_edit() {
        let env = TestEnv::new();
        env.tabs.add_existing(1);
        env.messenger.push(opened());
        env.messenger.push(opened());
        let flow = env.payment_flow();
        flow.set_amount("1");
        block_on(flow.submit());

        flow.handle_event(&result_event(
            json!({"status": "failed", "error": "Insufficient funds"}),
        ));
        assert_eq!(
            flow.status(),
            PaymentStatus::Failed {
                message: "Insufficient funds".to_string()
            }
        );
        // failure is not cleared by time
        env.timer.advance(60_000);
        assert!(matches!(flow.status(), PaymentStatus::Failed { .. }));

        flow.set_amount("2");
        assert_eq!(flow.status(), PaymentStatus::Idle);

        block_on(flow.submit());
        flow.handle_event(&result_event(json!({"status": "failed"})));
        assert_eq!(
            flow.status(),
            PaymentStatus::Failed {
                message: "Payment failed".to_string()
            }
        );
    }

    #[test]
    fn test_wallet_connected_ignored() {
        let env = TestEnv::new();
        let flow = env.payment_flow();
        flow.handle_event(&InboundEvent {
            kind: EventKind::WalletConnected,
            data: json!({"status": "success"}),
            timestamp: None,
        });
        assert_eq!(flow.status(), PaymentStatus::Idle);
    }

    #[test]
    fn test_stays_processing_without_result() {
        let env = TestEnv::new();
        env.tabs.add_existing(1);
        env.messenger.push(opened());
        let flow = env.payment_flow();
        flow.set_amount("1");
        block_on(flow.submit());

        env.timer.advance(24 * 60 * 60 * 1000);
        assert_eq!(flow.status(), PaymentStatus::Processing);
    }

    #[test]
    fn test_configured_timeout_fails_pending_attempt() {
        let mut env = TestEnv::new();
        env.config.result_timeout_ms = Some(60_000);
        env.tabs.add_existing(1);
        env.messenger.push(opened());
        let flow = env.payment_flow();
        flow.set_amount("1");
        block_on(flow.submit());

        env.timer.advance(59_999);
        assert_eq!(flow.status(), PaymentStatus::Processing);
        env.timer.advance(1);
        assert_eq!(
            flow.status(),
            PaymentStatus::Failed {
                message: "Timed out waiting for the payment result".to_string()
            }
        );
    }

    #[test]
    fn test_timeout_does_not_touch_resolved_attempt() {
        let mut env = TestEnv::new();
        env.config.result_timeout_ms = Some(60_000);
        env.tabs.add_existing(1);
        env.messenger.push(opened());
        let flow = env.payment_flow();
        flow.set_amount("1");
        block_on(flow.submit());

        flow.handle_event(&result_event(json!({"status": "success", "txHash": "short"})));
        assert_eq!(flow.display_hash().as_deref(), Some("short"));
        env.timer.advance(60_000);
        assert_eq!(flow.status(), PaymentStatus::Idle);
    }

    #[test]
    fn test_close_resets_display_only() {
        let env = TestEnv::new();
        env.tabs.add_existing(1);
        env.messenger.push(opened());
        let flow = env.payment_flow();
        flow.open();
        flow.set_amount("1");
        block_on(flow.submit());

        flow.close();
        assert_eq!(flow.status(), PaymentStatus::Idle);
        assert!(!flow.snapshot().open);

        // a late result still reaches the flow
        flow.handle_event(&result_event(json!({"status": "success", "txHash": HASH})));
        assert!(matches!(flow.status(), PaymentStatus::Success { .. }));
    }

    // Two attempts in flight: the first is parked in the tab warm-up while
    // the user closes, reopens and submits again. The first attempt's send
    // outcome is dropped; the next payment_result resolves the second one,
    // and a later stray result overrides it (results carry no token).
    #[test]
    fn test_overlapping_attempts() {
        let mut env = TestEnv::new();
        env.config.retry.max_attempts = 1;
        env.sleeper.gate();
        env.messenger.push(opened());
        let flow = env.payment_flow();

        let mut pool = LocalPool::new();
        let spawner = pool.spawner();

        flow.set_amount("5");
        let first = flow.clone();
        spawner
            .spawn_local(async move {
                first.submit().await;
            })
            .unwrap();
        pool.run_until_stalled();
        assert_eq!(flow.status(), PaymentStatus::Processing);
        assert_eq!(env.messenger.attempts(), 0);

        flow.close();
        flow.open();
        flow.set_amount("6");
        let second = flow.clone();
        spawner
            .spawn_local(async move {
                second.submit().await;
            })
            .unwrap();
        pool.run_until_stalled();
        // second attempt reused the tab the first one created
        assert_eq!(env.messenger.attempts(), 1);
        assert_eq!(env.messenger.sent()[0].1["data"]["amount"], "6");
        assert_eq!(flow.status(), PaymentStatus::Processing);

        // first attempt wakes up, its send fails, nothing changes
        env.sleeper.release();
        pool.run_until_stalled();
        assert_eq!(env.messenger.attempts(), 2);
        assert_eq!(flow.status(), PaymentStatus::Processing);

        flow.handle_event(&result_event(json!({"status": "success", "txHash": HASH})));
        assert!(matches!(flow.status(), PaymentStatus::Success { .. }));

        flow.handle_event(&result_event(json!({"status": "failed", "error": "stale"})));
        assert_eq!(
            flow.status(),
            PaymentStatus::Failed {
                message: "stale".to_string()
            }
        );
    }

    #[test]
    fn test_truncate_hash() {
        assert_eq!(truncate_hash("ABC"), "ABC");
        assert_eq!(truncate_hash("0123456789abcdef"), "0123456789abcdef");
        assert_eq!(truncate_hash(HASH), "ABC12345...67890XYZ");
    }

    #[test]
    fn test_amount_validation() {
        assert!(is_valid_amount("1"));
        assert!(is_valid_amount(" 0.001 "));
        assert!(is_valid_amount("1e3"));
        assert!(!is_valid_amount("1,5"));
        assert!(!is_valid_amount("-0.1"));
    }
}
