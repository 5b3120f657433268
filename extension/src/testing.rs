// In-memory stand-ins for the browser, shared by the unit tests

use crate::clock::Clock;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, DeliveryError, Result};
use crate::flow::{AuthFlow, FlowContext, PaymentFlow, TabLocator};
use crate::relay::{HostWindow, RuntimeSender};
use crate::router::{BusListener, ListenerId, MessageBus};
use crate::scheduler::{Sleeper, Timer};
use crate::services::KeyValueStore;
use crate::transport::{TabId, TabMessenger};
use async_trait::async_trait;
use futures::channel::oneshot;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;

pub struct FixedClock(Cell<u64>);

impl FixedClock {
    pub fn new(millis: u64) -> Self {
        Self(Cell::new(millis))
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.0.get()
    }
}

/// Records requested delays; when gated, sleeps park until `release`.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: RefCell<Vec<u32>>,
    gated: Cell<bool>,
    parked: RefCell<Vec<oneshot::Sender<()>>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<u32> {
        self.delays.borrow().clone()
    }

    pub fn gate(&self) {
        self.gated.set(true);
    }

    pub fn release(&self) {
        self.gated.set(false);
        for waiter in self.parked.borrow_mut().drain(..) {
            let _ = waiter.send(());
        }
    }
}

#[async_trait(?Send)]
impl Sleeper for RecordingSleeper {
    async fn sleep_ms(&self, ms: u32) {
        self.delays.borrow_mut().push(ms);
        if self.gated.get() {
            let (tx, rx) = oneshot::channel();
            self.parked.borrow_mut().push(tx);
            let _ = rx.await;
        }
    }
}

/// Virtual-time timer: tasks run only from `advance`.
#[derive(Default)]
pub struct ManualTimer {
    now: Cell<u64>,
    seq: Cell<u64>,
    tasks: RefCell<BTreeMap<(u64, u64), Box<dyn FnOnce()>>>,
}

impl ManualTimer {
    pub fn advance(&self, ms: u64) {
        let target = self.now.get() + ms;
        loop {
            let next = {
                let mut tasks = self.tasks.borrow_mut();
                match tasks.keys().next().copied() {
                    Some(key) if key.0 <= target => tasks.remove(&key).map(|task| (key.0, task)),
                    _ => None,
                }
            };
            match next {
                Some((due, task)) => {
                    self.now.set(due);
                    task();
                }
                None => break,
            }
        }
        self.now.set(target);
    }

    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }
}

impl Timer for ManualTimer {
    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>) {
        let seq = self.seq.get();
        self.seq.set(seq + 1);
        let due = self.now.get() + delay_ms as u64;
        self.tasks.borrow_mut().insert((due, seq), task);
    }
}

/// Answers sends from a script; once it runs dry every send fails.
#[derive(Default)]
pub struct ScriptedMessenger {
    script: RefCell<VecDeque<std::result::Result<Value, DeliveryError>>>,
    sent: RefCell<Vec<(TabId, Value)>>,
}

impl ScriptedMessenger {
    pub fn new(script: Vec<std::result::Result<Value, DeliveryError>>) -> Self {
        Self {
            script: RefCell::new(script.into()),
            sent: RefCell::new(Vec::new()),
        }
    }

    pub fn always_failing() -> Self {
        Self::default()
    }

    pub fn push(&self, outcome: std::result::Result<Value, DeliveryError>) {
        self.script.borrow_mut().push_back(outcome);
    }

    pub fn attempts(&self) -> usize {
        self.sent.borrow().len()
    }

    pub fn sent(&self) -> Vec<(TabId, Value)> {
        self.sent.borrow().clone()
    }
}

#[async_trait(?Send)]
impl TabMessenger for ScriptedMessenger {
    async fn send_to_tab(
        &self,
        tab_id: TabId,
        message: &Value,
    ) -> std::result::Result<Value, DeliveryError> {
        self.sent.borrow_mut().push((tab_id, message.clone()));
        self.script.borrow_mut().pop_front().unwrap_or_else(|| {
            Err(DeliveryError(
                "Could not establish connection. Receiving end does not exist.".into(),
            ))
        })
    }
}

#[derive(Default)]
pub struct FakeTabs {
    existing: RefCell<Vec<TabId>>,
    queries: RefCell<Vec<String>>,
    created: RefCell<Vec<(String, TabId)>>,
}

impl FakeTabs {
    pub fn add_existing(&self, tab_id: TabId) {
        self.existing.borrow_mut().push(tab_id);
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.created.borrow().iter().map(|(url, _)| url.clone()).collect()
    }

    pub fn created_ids(&self) -> Vec<TabId> {
        self.created.borrow().iter().map(|(_, id)| *id).collect()
    }
}

#[async_trait(?Send)]
impl TabLocator for FakeTabs {
    async fn find_tab(&self, url_pattern: &str) -> Result<Option<TabId>> {
        self.queries.borrow_mut().push(url_pattern.to_string());
        Ok(self.existing.borrow().first().copied())
    }

    async fn create_tab(&self, url: &str) -> Result<TabId> {
        let tab_id = 100 + self.created.borrow().len() as TabId;
        self.created.borrow_mut().push((url.to_string(), tab_id));
        self.existing.borrow_mut().push(tab_id);
        Ok(tab_id)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn raw(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }
}

#[async_trait(?Send)]
impl KeyValueStore for MemoryStore {
    async fn get_raw(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.raw(key))
    }

    async fn set_raw(&self, key: &str, value: Value) -> Result<()> {
        self.values.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.borrow_mut().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.values.borrow_mut().clear();
        Ok(())
    }
}

/// Single-process stand-in for chrome.runtime.onMessage.
#[derive(Default)]
pub struct LocalBus {
    next_id: Cell<ListenerId>,
    removals: Cell<usize>,
    listeners: RefCell<Vec<(ListenerId, BusListener)>>,
}

impl LocalBus {
    pub fn emit(&self, message: &Value) {
        // Snapshot so listeners may unregister while being called
        let listeners: Vec<BusListener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(message);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn removals(&self) -> usize {
        self.removals.get()
    }
}

impl MessageBus for LocalBus {
    fn add_listener(&self, listener: BusListener) -> ListenerId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.removals.set(self.removals.get() + 1);
        self.listeners.borrow_mut().retain(|(existing, _)| *existing != id);
    }
}

impl RuntimeSender for LocalBus {
    fn send(&self, message: &Value) {
        self.emit(message);
    }
}

#[derive(Default)]
pub struct RecordingSender {
    sent: RefCell<Vec<Value>>,
}

impl RecordingSender {
    pub fn sent(&self) -> Vec<Value> {
        self.sent.borrow().clone()
    }
}

impl RuntimeSender for RecordingSender {
    fn send(&self, message: &Value) {
        self.sent.borrow_mut().push(message.clone());
    }
}

#[derive(Default)]
pub struct FakeWindow {
    blocked: Cell<bool>,
    opened: RefCell<Vec<(String, String, String)>>,
    posted: RefCell<Vec<(Value, String)>>,
    scripts: RefCell<Vec<String>>,
}

impl FakeWindow {
    pub fn block_popups(&self) {
        self.blocked.set(true);
    }

    pub fn opened(&self) -> Vec<(String, String, String)> {
        self.opened.borrow().clone()
    }

    pub fn posted(&self) -> Vec<(Value, String)> {
        self.posted.borrow().clone()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.scripts.borrow().clone()
    }
}

impl HostWindow for FakeWindow {
    fn open_popup(&self, url: &str, name: &str, features: &str) -> Result<()> {
        if self.blocked.get() {
            return Err(BridgeError::Browser("popup blocked".into()));
        }
        self.opened
            .borrow_mut()
            .push((url.to_string(), name.to_string(), features.to_string()));
        Ok(())
    }

    fn post_message(&self, message: &Value, target_origin: &str) -> Result<()> {
        self.posted
            .borrow_mut()
            .push((message.clone(), target_origin.to_string()));
        Ok(())
    }

    fn inject_script(&self, source: &str) -> Result<()> {
        self.scripts.borrow_mut().push(source.to_string());
        Ok(())
    }
}

/// All doubles wired together with the default config.
pub struct TestEnv {
    pub config: BridgeConfig,
    pub messenger: Rc<ScriptedMessenger>,
    pub tabs: Rc<FakeTabs>,
    pub store: Rc<MemoryStore>,
    pub sleeper: Rc<RecordingSleeper>,
    pub timer: Rc<ManualTimer>,
    pub clock: Rc<FixedClock>,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            config: BridgeConfig::default(),
            messenger: Rc::new(ScriptedMessenger::default()),
            tabs: Rc::new(FakeTabs::default()),
            store: Rc::new(MemoryStore::default()),
            sleeper: Rc::new(RecordingSleeper::default()),
            timer: Rc::new(ManualTimer::default()),
            clock: Rc::new(FixedClock::new(1_767_225_600_000)),
        }
    }

    pub fn context(&self) -> FlowContext {
        FlowContext {
            messenger: self.messenger.clone(),
            tabs: self.tabs.clone(),
            store: self.store.clone(),
            sleeper: self.sleeper.clone(),
            timer: self.timer.clone(),
            clock: self.clock.clone(),
        }
    }

    pub fn payment_flow(&self) -> PaymentFlow {
        PaymentFlow::new(self.context(), Rc::new(self.config.clone()))
    }

    pub fn auth_flow(&self) -> AuthFlow {
        AuthFlow::new(self.context(), Rc::new(self.config.clone()))
    }
}
