//! The priority-ordered, type-erased event bus.
//!
//! Subscribe and Unsubscribe take exclusive access to the subscription
//! index; Publish takes shared access only long enough to snapshot the
//! handler list for its topic, then releases the lock before invoking any
//! handler. A single publish runs entirely on the calling thread — handlers
//! never run concurrently with each other for the same event — so handlers
//! can mutate the event's `Context` without locking.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};

use crate::error::{ArbiterError, HandlerFailure, HandlerFailureReason, InvariantViolation, PublishOutcome};
use crate::event::{CancellationToken, Event, SubscriptionId, Topic};

type HandlerBox<T> =
    Arc<dyn Fn(&CancellationToken, &mut Event<T>) -> Result<(), String> + Send + Sync>;

struct StoredSubscription {
    id: SubscriptionId,
    priority: i32,
    handler: Arc<dyn Any + Send + Sync>,
}

struct TopicEntry {
    type_id: TypeId,
    type_name: &'static str,
    subs: Vec<StoredSubscription>,
}

/// Owns the topic registry and performs ordered dispatch. Cheaply cloneable
/// — clones share the same subscription index.
#[derive(Clone)]
pub struct Bus {
    topics: Arc<RwLock<HashMap<&'static str, TopicEntry>>>,
}

impl Bus {
    pub fn new() -> Self {
        Self {
            topics: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a handler on `topic` at `priority`. Smaller priorities run
    /// first; ties run in registration order. Fails fast if `topic`'s key
    /// was already registered with a different payload type.
    pub fn subscribe<T: Send + Sync + 'static>(
        &self,
        topic: Topic<T>,
        priority: i32,
        handler: impl Fn(&CancellationToken, &mut Event<T>) -> Result<(), String> + Send + Sync + 'static,
    ) -> Result<SubscriptionId, ArbiterError> {
        let type_id = TypeId::of::<T>();
        let mut topics = self.topics.write().expect("bus lock poisoned");
        let entry = topics.entry(topic.key).or_insert_with(|| TopicEntry {
            type_id,
            type_name: std::any::type_name::<T>(),
            subs: Vec::new(),
        });
        if entry.type_id != type_id {
            return Err(ArbiterError::TopicTypeMismatch { key: topic.key });
        }
        let id = SubscriptionId::new();
        let boxed: HandlerBox<T> = Arc::new(handler);
        entry.subs.push(StoredSubscription {
            id,
            priority,
            handler: Arc::new(boxed),
        });
        tracing::trace!(topic = topic.key, %id, priority, "subscribed");
        Ok(id)
    }

    /// Remove a subscription. Unknown handles fail softly — the caller may
    /// have already unsubscribed, or the handle may belong to another bus.
    ///
    /// Safe to call from inside a handler during dispatch: if the target
    /// handler has not yet been invoked in the *current* publish, it will
    /// not run; handlers already invoked are unaffected.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<(), ArbiterError> {
        let mut topics = self.topics.write().expect("bus lock poisoned");
        for entry in topics.values_mut() {
            if let Some(pos) = entry.subs.iter().position(|s| s.id == id) {
                entry.subs.remove(pos);
                tracing::trace!(%id, "unsubscribed");
                return Ok(());
            }
        }
        Err(ArbiterError::UnknownSubscription(id))
    }

    /// Dispatch `event` to every handler currently registered on the
    /// event's own topic (`event.topic()`), in ascending-priority /
    /// FIFO-tiebreak order. Every handler gets its chance regardless of
    /// earlier failures; the composite outcome names all of them. Handler
    /// panics are caught and reported as failures rather than unwinding
    /// past the bus.
    pub fn publish<T: Send + Sync + 'static>(
        &self,
        cancellation: &CancellationToken,
        event: &mut Event<T>,
    ) -> PublishOutcome {
        let key = event.topic();
        let snapshot: Vec<(SubscriptionId, Arc<dyn Any + Send + Sync>)> = {
            let topics = self.topics.read().expect("bus lock poisoned");
            let Some(entry) = topics.get(key) else {
                return PublishOutcome::default();
            };
            let mut subs: Vec<(SubscriptionId, i32, Arc<dyn Any + Send + Sync>)> = entry
                .subs
                .iter()
                .map(|s| (s.id, s.priority, s.handler.clone()))
                .collect();
            // Vec::sort_by_key is stable: ties keep registration order.
            subs.sort_by_key(|(_, priority, _)| *priority);
            subs.into_iter().map(|(id, _, h)| (id, h)).collect()
        };

        let mut failures = Vec::new();
        for (id, handler_any) in snapshot {
            if !self.is_still_subscribed(key, id) {
                continue;
            }
            // Unreachable from correct usage: `subscribe` rejects a second
            // payload type for the same key before any handler is stored.
            let handler = handler_any.downcast_ref::<HandlerBox<T>>().unwrap_or_else(|| {
                panic!(
                    "{}",
                    InvariantViolation(format!(
                        "topic {key:?} handler stored with a type incompatible with this publish"
                    ))
                )
            }).clone();
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
                handler(cancellation, event)
            }));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(message)) => {
                    tracing::warn!(topic = key, %id, %message, "handler returned failure");
                    failures.push(HandlerFailure {
                        subscription: id,
                        topic: key,
                        reason: HandlerFailureReason::Returned(message),
                    });
                }
                Err(panic_payload) => {
                    let message = panic_message(&panic_payload);
                    tracing::warn!(topic = key, %id, %message, "handler panicked");
                    failures.push(HandlerFailure {
                        subscription: id,
                        topic: key,
                        reason: HandlerFailureReason::Panicked(message),
                    });
                }
            }
        }
        PublishOutcome::new(failures)
    }

    fn is_still_subscribed(&self, key: &'static str, id: SubscriptionId) -> bool {
        let topics = self.topics.read().expect("bus lock poisoned");
        topics
            .get(key)
            .map(|entry| entry.subs.iter().any(|s| s.id == id))
            .unwrap_or(false)
    }

    /// Number of live subscriptions across every topic. Intended for
    /// diagnostics and tests, not hot-path use.
    pub fn subscription_count(&self) -> usize {
        let topics = self.topics.read().expect("bus lock poisoned");
        topics.values().map(|e| e.subs.len()).sum()
    }

    #[cfg(test)]
    fn payload_type_name(&self, key: &str) -> Option<&'static str> {
        let topics = self.topics.read().expect("bus lock poisoned");
        topics.get(key).map(|e| e.type_name)
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked with a non-string payload".to_string()
    }
}
