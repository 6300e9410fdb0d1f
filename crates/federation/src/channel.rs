use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use tracing::debug;

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Named publish/subscribe channel owned by an application context.
///
/// Handlers run synchronously on the publishing task, outside the listener
/// lock, so a handler may itself publish or unsubscribe.
pub struct EventChannel<T> {
    name: String,
    next_id: AtomicU64,
    listeners: Mutex<Vec<(SubscriptionId, Handler<T>)>>,
}

impl<T> EventChannel<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscribe(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Arc::new(handler)));
        debug!(channel = %self.name, ?id, "listener subscribed");
        id
    }

    /// Returns `false` when `id` was not subscribed, so repeated calls are harmless.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(candidate, _)| *candidate != id);
        let removed = listeners.len() != before;
        if removed {
            debug!(channel = %self.name, ?id, "listener unsubscribed");
        }
        removed
    }

    /// Delivers `event` to every current listener and returns how many saw it.
    pub fn publish(&self, event: &T) -> usize {
        let handlers: Vec<Handler<T>> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl<T: 'static> EventChannel<T> {
    /// Subscribes and ties the registration to the returned guard.
    pub fn listen(
        self: &Arc<Self>,
        handler: impl Fn(&T) + Send + Sync + 'static,
    ) -> Subscription<T> {
        let id = self.subscribe(handler);
        Subscription {
            channel: Arc::clone(self),
            id,
        }
    }
}

impl<T> fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("name", &self.name)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Unsubscribes on drop.
pub struct Subscription<T: 'static> {
    channel: Arc<EventChannel<T>>,
    id: SubscriptionId,
}

impl<T: 'static> Subscription<T> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn channel(&self) -> &Arc<EventChannel<T>> {
        &self.channel
    }
}

impl<T: 'static> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.channel.unsubscribe(self.id);
    }
}

impl<T: 'static> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel.name())
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/channel_tests.rs"]
mod tests;
