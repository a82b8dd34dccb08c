//! Typed single-threaded publish/subscribe channel.
//!
//! # Invariants
//! - Listeners run in registration order.
//! - No internal borrow is held while a listener runs, so listeners may
//!   subscribe, unsubscribe, emit, or call back into stores.
//! - A listener unsubscribed mid-dispatch is not invoked afterwards, even
//!   within the same `emit`.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Payload that can be routed by topic.
pub trait BusEvent {
    fn topic(&self) -> Cow<'_, str>;
}

/// Handle returned by `subscribe*`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener<T> = Rc<dyn Fn(&T)>;

struct Subscription<T> {
    id: SubscriptionId,
    topic: Option<String>,
    listener: Listener<T>,
}

pub struct EventBus<T> {
    next_id: Cell<u64>,
    subscriptions: RefCell<Vec<Subscription<T>>>,
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self {
            next_id: Cell::new(1),
            subscriptions: RefCell::new(Vec::new()),
        }
    }
}

impl<T> Debug for EventBus<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<T> EventBus<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener_count(&self) -> usize {
        self.subscriptions.borrow().len()
    }
}

impl<T: BusEvent> EventBus<T> {

    /// Registers `listener` for events whose topic equals `topic`.
    pub fn subscribe(
        &self,
        topic: impl Into<String>,
        listener: impl Fn(&T) + 'static,
    ) -> SubscriptionId {
        self.register(Some(topic.into()), Rc::new(listener))
    }

    /// Registers `listener` for every event.
    pub fn subscribe_all(&self, listener: impl Fn(&T) + 'static) -> SubscriptionId {
        self.register(None, Rc::new(listener))
    }

    /// Returns `false` when `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.borrow_mut();
        let before = subscriptions.len();
        subscriptions.retain(|subscription| subscription.id != id);
        subscriptions.len() != before
    }

    /// Delivers `event` to matching listeners and returns how many ran.
    pub fn emit(&self, event: &T) -> usize {
        let topic = event.topic();
        let targets: Vec<(SubscriptionId, Listener<T>)> = self
            .subscriptions
            .borrow()
            .iter()
            .filter(|subscription| {
                subscription
                    .topic
                    .as_deref()
                    .map_or(true, |wanted| wanted == topic.as_ref())
            })
            .map(|subscription| (subscription.id, Rc::clone(&subscription.listener)))
            .collect();

        let mut delivered = 0;
        for (id, listener) in targets {
            if !self.is_subscribed(id) {
                continue;
            }
            listener(event);
            delivered += 1;
        }
        delivered
    }

    fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscriptions
            .borrow()
            .iter()
            .any(|subscription| subscription.id == id)
    }

    fn register(&self, topic: Option<String>, listener: Listener<T>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscriptions.borrow_mut().push(Subscription {
            id,
            topic,
            listener,
        });
        id
    }
}
