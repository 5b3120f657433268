// Global bridge context using Dioxus context API
// One set of browser collaborators shared by every mounted surface

use crate::clock::SystemClock;
use crate::config::BridgeConfig;
use crate::flow::{AuthFlow, FlowContext, PaymentFlow};
use crate::router::{MessageBus, MessageRouter};
use crate::scheduler::BrowserScheduler;
use crate::services::{ChromeRuntimeBus, ChromeStorage, ChromeTabs};
use std::rc::Rc;

#[derive(Clone)]
pub struct BridgeContext {
    pub config: Rc<BridgeConfig>,
    pub flows: FlowContext,
    pub bus: Rc<dyn MessageBus>,
}

// Manual PartialEq implementation (contexts don't need real equality)
impl PartialEq for BridgeContext {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.config, &other.config)
    }
}

impl BridgeContext {
    pub fn browser() -> Self {
        let tabs = Rc::new(ChromeTabs::new());
        let scheduler = Rc::new(BrowserScheduler);

        Self {
            config: Rc::new(BridgeConfig::bundled()),
            flows: FlowContext {
                messenger: tabs.clone(),
                tabs,
                store: Rc::new(ChromeStorage::new()),
                sleeper: scheduler.clone(),
                timer: scheduler,
                clock: Rc::new(SystemClock),
            },
            bus: Rc::new(ChromeRuntimeBus::new()),
        }
    }

    pub fn payment_flow(&self) -> PaymentFlow {
        PaymentFlow::new(self.flows.clone(), self.config.clone())
    }

    pub fn auth_flow(&self) -> AuthFlow {
        AuthFlow::new(self.flows.clone(), self.config.clone())
    }

    /// A fresh router per mounted surface; it must be cleaned up on unmount.
    pub fn router(&self) -> MessageRouter {
        MessageRouter::new(self.bus.clone())
    }
}
