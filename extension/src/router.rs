// Inbound events from the relay, dispatched to the one mounted UI surface.
//
// The extension bus is process-wide; a router owns exactly one listener on
// it and holds at most one subscriber. Subscribing again replaces the
// previous subscriber for every event type.

use crate::protocol::InboundEvent;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub type ListenerId = u32;
pub type BusListener = Rc<dyn Fn(&Value)>;
pub type Subscriber = Rc<dyn Fn(&InboundEvent)>;

pub trait MessageBus {
    fn add_listener(&self, listener: BusListener) -> ListenerId;
    fn remove_listener(&self, id: ListenerId);
}

pub struct MessageRouter {
    bus: Rc<dyn MessageBus>,
    listener: Cell<Option<ListenerId>>,
    subscriber: Rc<RefCell<Option<Subscriber>>>,
}

impl MessageRouter {
    pub fn new(bus: Rc<dyn MessageBus>) -> Self {
        let subscriber: Rc<RefCell<Option<Subscriber>>> = Rc::new(RefCell::new(None));

        let slot = Rc::clone(&subscriber);
        let listener = bus.add_listener(Rc::new(move |message: &Value| {
            let Some(event) = InboundEvent::parse(message) else {
                log::trace!("Router ignoring message: {}", message);
                return;
            };
            // Clone out so the callback may re-subscribe or clean up
            let current = slot.borrow().clone();
            match current {
                Some(callback) => callback(&event),
                None => log::debug!("No subscriber for {}", event.kind.as_str()),
            }
        }));

        Self {
            bus,
            listener: Cell::new(Some(listener)),
            subscriber,
        }
    }

    pub fn on_message(&self, callback: impl Fn(&InboundEvent) + 'static) {
        if self.listener.get().is_none() {
            log::warn!("on_message called on a router that was cleaned up");
            return;
        }
        *self.subscriber.borrow_mut() = Some(Rc::new(callback));
    }

    pub fn has_subscriber(&self) -> bool {
        self.subscriber.borrow().is_some()
    }

    pub fn cleanup(&self) {
        if let Some(id) = self.listener.take() {
            self.bus.remove_listener(id);
        }
        self.subscriber.borrow_mut().take();
    }
}

impl Drop for MessageRouter {
    fn drop(&mut self) {
        self.cleanup();
    }
}
