//! In-process publish/subscribe for generation events.
//!
//! Subscribers register per event type. Sync handlers run sequentially in
//! registration order; async handlers run concurrently and are awaited
//! collectively. A failing handler (panic or task error) is logged and
//! isolated so it never affects other handlers or the emitter.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use futures::Future;
use tracing::{debug, error};

use super::GenerationEvent;

/// Boxed synchronous handler.
type SyncHandler = dyn Fn(&GenerationEvent) + Send + Sync;

/// Boxed asynchronous handler factory.
type AsyncHandler =
    dyn Fn(GenerationEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync;

/// Identifies a subscription for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Registration<H: ?Sized> {
    id: SubscriptionId,
    handler: Arc<H>,
}

#[derive(Default)]
struct Handlers {
    sync: HashMap<String, Vec<Registration<SyncHandler>>>,
    r#async: HashMap<String, Vec<Registration<AsyncHandler>>>,
}

/// Event bus keyed by event type name.
///
/// Handler lists are copied before iteration so a handler may subscribe or
/// unsubscribe during dispatch without deadlocking or invalidating the
/// in-flight emit.
pub struct EventBus {
    handlers: Mutex<Handlers>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(Handlers::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe a synchronous handler to an event type.
    pub fn subscribe<F>(&self, event_type: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&GenerationEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut handlers = self.handlers.lock().expect("event bus poisoned");
        handlers
            .sync
            .entry(event_type.to_string())
            .or_default()
            .push(Registration {
                id,
                handler: Arc::new(handler),
            });
        debug!(event_type, "subscribed sync handler");
        id
    }

    /// Subscribe an asynchronous handler to an event type.
    pub fn subscribe_async<F, Fut>(&self, event_type: &str, handler: F) -> SubscriptionId
    where
        F: Fn(GenerationEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let boxed: Arc<AsyncHandler> = Arc::new(move |event| {
            Box::pin(handler(event)) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let mut handlers = self.handlers.lock().expect("event bus poisoned");
        handlers
            .r#async
            .entry(event_type.to_string())
            .or_default()
            .push(Registration { id, handler: boxed });
        debug!(event_type, "subscribed async handler");
        id
    }

    /// Remove a subscription. No-op if already removed.
    pub fn unsubscribe(&self, event_type: &str, id: SubscriptionId) {
        let mut handlers = self.handlers.lock().expect("event bus poisoned");
        if let Some(list) = handlers.sync.get_mut(event_type) {
            list.retain(|reg| reg.id != id);
        }
        if let Some(list) = handlers.r#async.get_mut(event_type) {
            list.retain(|reg| reg.id != id);
        }
    }

    /// Publish an event to all subscribers of its type.
    ///
    /// Sync handlers run first, in registration order. Async handlers are
    /// spawned concurrently and awaited together. Failures are logged and
    /// contained.
    pub async fn emit(&self, event: &GenerationEvent) {
        let event_type = event.type_name();

        // Copy-on-iterate: snapshot the handler lists, then drop the lock.
        let (sync_handlers, async_handlers) = {
            let handlers = self.handlers.lock().expect("event bus poisoned");
            let sync: Vec<Arc<SyncHandler>> = handlers
                .sync
                .get(event_type)
                .map(|list| list.iter().map(|reg| reg.handler.clone()).collect())
                .unwrap_or_default();
            let r#async: Vec<Arc<AsyncHandler>> = handlers
                .r#async
                .get(event_type)
                .map(|list| list.iter().map(|reg| reg.handler.clone()).collect())
                .unwrap_or_default();
            (sync, r#async)
        };

        for handler in sync_handlers {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| handler(event)));
            if result.is_err() {
                error!(event_type, "sync event handler panicked");
            }
        }

        if async_handlers.is_empty() {
            return;
        }

        let tasks: Vec<_> = async_handlers
            .into_iter()
            .map(|handler| {
                let event = event.clone();
                tokio::spawn(async move { handler(event).await })
            })
            .collect();

        for result in join_all(tasks).await {
            if let Err(join_err) = result {
                error!(event_type, error = %join_err, "async event handler failed");
            }
        }
    }

    /// Number of live subscriptions for a type (sync + async).
    pub fn subscriber_count(&self, event_type: &str) -> usize {
        let handlers = self.handlers.lock().expect("event bus poisoned");
        handlers.sync.get(event_type).map_or(0, Vec::len)
            + handlers.r#async.get(event_type).map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
