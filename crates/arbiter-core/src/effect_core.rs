//! The reusable lifecycle primitive every rule object embeds.
//!
//! Proficiencies, conditions (Rage, Dodging, Disengaging), and class
//! features are all, mechanically, the same shape: a bundle of subscriptions
//! that get added to the bus atomically and removed atomically. `EffectCore`
//! is that shape, factored out once so rule authors never reinvent
//! subscription bookkeeping or leak handles.
//!
//! Rust has no struct embedding, so where the design notes call for "expose
//! the core explicitly", a rule struct holds an `EffectCore` field and
//! forwards `apply`/`remove` to it (see the proficiency and condition
//! fixtures under `tests/` for the pattern).

use serde::Serialize;
use smallvec::SmallVec;

use crate::bus::Bus;
use crate::entity::Entity;
use crate::event::{CancellationToken, Event, SubscriptionId, Topic};

type OnApply = Box<dyn Fn(&mut EffectSubscriber<'_>) -> Result<(), String> + Send + Sync>;
type OnRemove = Box<dyn Fn(&Bus) -> Result<(), String> + Send + Sync>;

/// Most rule objects subscribe a handful of handlers (one or two topics,
/// occasionally more); inline storage avoids a heap allocation for the
/// common case without capping how many a rule can hold.
type HeldHandles = SmallVec<[SubscriptionId; 4]>;

/// `{ref, active}` — the persisted shape the design doc allows an effect
/// core to expose. The core imposes no serialization format beyond this;
/// consumers decide how (or whether) to persist it.
#[derive(Debug, Serialize)]
pub struct EffectCoreSnapshot {
    #[serde(rename = "ref")]
    pub ref_: String,
    pub active: bool,
}

/// Lifecycle body embedded by every rule object.
///
/// Invariants: `active == false` implies the held-handle set is empty;
/// `apply` on an already-active core is a no-op; `remove` on an inactive
/// core is a no-op; after a successful `remove`, the held-handle set is
/// empty again.
pub struct EffectCore {
    identifier: String,
    type_tag: String,
    source_descriptor: String,
    active: bool,
    held: HeldHandles,
    on_apply: Option<OnApply>,
    on_remove: Option<OnRemove>,
}

impl EffectCore {
    pub fn new(
        identifier: impl Into<String>,
        type_tag: impl Into<String>,
        source_descriptor: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            type_tag: type_tag.into(),
            source_descriptor: source_descriptor.into(),
            active: false,
            held: HeldHandles::new(),
            on_apply: None,
            on_remove: None,
        }
    }

    pub fn with_on_apply(
        mut self,
        hook: impl Fn(&mut EffectSubscriber<'_>) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.on_apply = Some(Box::new(hook));
        self
    }

    pub fn with_on_remove(
        mut self,
        hook: impl Fn(&Bus) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.on_remove = Some(Box::new(hook));
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn held_handles(&self) -> &[SubscriptionId] {
        &self.held
    }

    pub fn source_descriptor(&self) -> &str {
        &self.source_descriptor
    }

    pub fn snapshot(&self) -> EffectCoreSnapshot {
        EffectCoreSnapshot {
            ref_: self.identifier.clone(),
            active: self.active,
        }
    }

    /// No-op if already active. Otherwise runs `onApply`, which typically
    /// subscribes several handlers via the [`EffectSubscriber`] helper
    /// (recording each handle automatically). If `onApply` fails, every
    /// subscription made during this call is rolled back before the error
    /// is returned — Apply is all-or-nothing.
    pub fn apply(&mut self, bus: &Bus) -> Result<(), String> {
        if self.active {
            return Ok(());
        }
        let on_apply = self.on_apply.take();
        let result = match &on_apply {
            Some(hook) => {
                let mut subscriber = EffectSubscriber {
                    core: &mut *self,
                    bus,
                };
                hook(&mut subscriber)
            }
            None => Ok(()),
        };
        self.on_apply = on_apply;

        match result {
            Ok(()) => {
                self.active = true;
                tracing::debug!(id = %self.identifier, kind = %self.type_tag, "effect applied");
                Ok(())
            }
            Err(reason) => {
                for id in self.held.drain(..) {
                    bus.unsubscribe(id).ok();
                }
                tracing::debug!(id = %self.identifier, %reason, "effect apply rolled back");
                Err(reason)
            }
        }
    }

    /// No-op if not active. Otherwise unsubscribes every held handle
    /// (best-effort — a failing unsubscribe does not stop the others),
    /// invokes `onRemove` if present, clears the held list, and sets
    /// `active = false`.
    pub fn remove(&mut self, bus: &Bus) -> Result<(), String> {
        if !self.active {
            return Ok(());
        }
        for id in self.held.drain(..) {
            if let Err(err) = bus.unsubscribe(id) {
                tracing::debug!(id = %self.identifier, %err, "best-effort unsubscribe failed during remove");
            }
        }
        let on_remove = self.on_remove.take();
        let result = match &on_remove {
            Some(hook) => hook(bus),
            None => Ok(()),
        };
        self.on_remove = on_remove;
        self.active = false;
        tracing::debug!(id = %self.identifier, kind = %self.type_tag, "effect removed");
        result
    }
}

impl Entity for EffectCore {
    fn id(&self) -> &str {
        &self.identifier
    }

    fn kind(&self) -> &str {
        &self.type_tag
    }
}

/// Passed into an `onApply` hook so it can subscribe to the bus while the
/// resulting handle is recorded in the owning [`EffectCore`] automatically,
/// without the hook needing a direct `&mut EffectCore`.
pub struct EffectSubscriber<'a> {
    core: &'a mut EffectCore,
    bus: &'a Bus,
}

impl<'a> EffectSubscriber<'a> {
    /// Exactly like `Bus::subscribe`, but the resulting handle is appended
    /// to the owning effect's held-handle list.
    pub fn subscribe<T: Send + Sync + 'static>(
        &mut self,
        topic: Topic<T>,
        priority: i32,
        handler: impl Fn(&CancellationToken, &mut Event<T>) -> Result<(), String> + Send + Sync + 'static,
    ) -> Result<SubscriptionId, String> {
        let id = self
            .bus
            .subscribe(topic, priority, handler)
            .map_err(|e| e.to_string())?;
        self.core.held.push(id);
        Ok(id)
    }

    pub fn bus(&self) -> &Bus {
        self.bus
    }

    /// The owning effect's identifier, for handlers that filter events by
    /// `event.source().id() == owner_id()`.
    pub fn owner_id(&self) -> &str {
        &self.core.identifier
    }
}
