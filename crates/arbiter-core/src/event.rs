//! Event identity, topics, subscription handles, and cancellation.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use crate::context::Context;
use crate::entity::Entity;

/// A handle to an entity that may outlive the call that looked it up.
pub type EntityHandle = Arc<dyn Entity + Send + Sync>;

/// Cooperative cancellation signal passed to every handler.
///
/// The bus never preemptively interrupts a handler; handlers are expected to
/// check `is_cancelled` and return early. Cloning shares the same underlying
/// flag, so a caller can cancel an in-flight publish from another thread.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Opaque handle returned by `Subscribe`, the only way to `Unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A typed channel on the bus, identified by a string key and a payload
/// type `T`. `T` never holds data itself — the uniform `{topic, source,
/// target, context}` event shape carries everything handlers see — it exists
/// purely so `Subscribe`/`Publish` callsites are checked against each other
/// at compile time. The bus additionally checks the key against the `T` it
/// was first registered with at runtime, so two `Topic` values sharing a key
/// but disagreeing on `T` fail fast instead of silently routing payloads to
/// the wrong handlers.
pub struct Topic<T> {
    pub key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Topic<T> {
    pub const fn new(key: &'static str) -> Self {
        Self {
            key,
            _marker: PhantomData,
        }
    }

    /// Pair this topic with a bus, returning a type-checked adapter.
    pub fn on<'bus>(&self, bus: &'bus crate::bus::Bus) -> TopicOnBus<'bus, T> {
        TopicOnBus {
            bus,
            topic: Topic::new(self.key),
        }
    }
}

impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Topic<T> {}

impl<T> fmt::Debug for Topic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Topic").field("key", &self.key).finish()
    }
}

/// A typed adapter pairing a [`Topic`] with a specific bus instance, so
/// `subscribe`/`publish` callsites never need to name `T` explicitly.
pub struct TopicOnBus<'bus, T> {
    bus: &'bus crate::bus::Bus,
    topic: Topic<T>,
}

impl<'bus, T: Send + Sync + 'static> TopicOnBus<'bus, T> {
    pub fn subscribe(
        &self,
        priority: i32,
        handler: impl Fn(&CancellationToken, &mut Event<T>) -> Result<(), String> + Send + Sync + 'static,
    ) -> Result<SubscriptionId, crate::error::ArbiterError> {
        self.bus.subscribe(self.topic, priority, handler)
    }

    pub fn publish(
        &self,
        cancellation: &CancellationToken,
        event: &mut Event<T>,
    ) -> crate::error::PublishOutcome {
        self.bus.publish(cancellation, event)
    }
}

/// A concrete message on a topic: immutable identity plus the mutable
/// [`Context`] every handler on the topic sees and amends.
///
/// `source`/`target` are immutable after construction. After the publish
/// call that carries this event returns, it is no longer considered live —
/// nothing stops a caller from holding onto it, but no further handler will
/// ever see it.
pub struct Event<T> {
    topic: &'static str,
    source: Option<EntityHandle>,
    target: Option<EntityHandle>,
    context: Context,
    _marker: PhantomData<T>,
}

impl<T> Event<T> {
    pub fn new(topic: &'static str) -> Self {
        Self {
            topic,
            source: None,
            target: None,
            context: Context::new(),
            _marker: PhantomData,
        }
    }

    pub fn with_source(mut self, source: EntityHandle) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_target(mut self, target: EntityHandle) -> Self {
        self.target = Some(target);
        self
    }

    pub fn topic(&self) -> &'static str {
        self.topic
    }

    pub fn source(&self) -> Option<&EntityHandle> {
        self.source.as_ref()
    }

    pub fn target(&self) -> Option<&EntityHandle> {
        self.target.as_ref()
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Consume the event, returning its context. Resolvers use this once a
    /// chain's final topic has been published and every modifier is in.
    pub fn into_context(self) -> Context {
        self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_token_shares_state_across_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn subscription_ids_are_unique() {
        let a = SubscriptionId::new();
        let b = SubscriptionId::new();
        assert_ne!(a, b);
    }
}
