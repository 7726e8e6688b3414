//! In-process observer bus.
//!
//! Producers publish `SafetyEvent`s and consumers subscribe by kind.
//! Everything runs on one logical thread: `publish` calls each handler to
//! completion before the next, so handlers may freely mutate the state they
//! captured.

use crate::risk::RiskUpdate;
use crate::types::{DriverState, WeatherSnapshot};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Risk,
    Weather,
    DriverState,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SafetyEvent {
    Risk(RiskUpdate),
    Weather(WeatherSnapshot),
    DriverState(DriverState),
}

impl SafetyEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SafetyEvent::Risk(_) => EventKind::Risk,
            SafetyEvent::Weather(_) => EventKind::Weather,
            SafetyEvent::DriverState(_) => EventKind::DriverState,
        }
    }
}

type Handler = Rc<RefCell<dyn FnMut(&SafetyEvent)>>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: Vec<(u64, EventKind, Handler)>,
}

impl Registry {
    fn contains(&self, id: u64) -> bool {
        self.handlers.iter().any(|(h, _, _)| *h == id)
    }
}

/// Cheap to clone; clones share the same subscriber list.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Rc<RefCell<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: FnMut(&SafetyEvent) + 'static,
    {
        let handler: Handler = Rc::new(RefCell::new(handler));
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.handlers.push((id, kind, handler));

        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
            active: Cell::new(true),
        }
    }

    /// Deliver `event` to every current subscriber of its kind.
    ///
    /// Returns the number of handlers that ran. A handler that publishes
    /// re-entrantly to itself is skipped for the nested event.
    pub fn publish(&self, event: &SafetyEvent) -> usize {
        let kind = event.kind();
        let targets: Vec<(u64, Handler)> = self
            .registry
            .borrow()
            .handlers
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(id, _, h)| (*id, Rc::clone(h)))
            .collect();

        let mut delivered = 0;
        for (id, handler) in targets {
            // an earlier handler may have unsubscribed this one
            if !self.registry.borrow().contains(id) {
                continue;
            }
            match handler.try_borrow_mut() {
                Ok(mut h) => {
                    (&mut *h)(event);
                    delivered += 1;
                }
                Err(_) => {
                    log::warn!("Skipping re-entrant {:?} handler {}", kind, id);
                }
            }
        }
        delivered
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.registry
            .borrow()
            .handlers
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .count()
    }
}

/// Handle returned by [`EventBus::subscribe`].
///
/// `unsubscribe` is idempotent and harmless after the bus is gone.
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
    active: Cell<bool>,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if !self.active.replace(false) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry
                .borrow_mut()
                .handlers
                .retain(|(id, _, _)| *id != self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.get() && self.registry.strong_count() > 0
    }
}
