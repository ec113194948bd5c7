//! Depletable resources, bounded counters, and the per-owner pool that
//! groups them with event-driven restoration.

use std::collections::HashMap;

use serde::Serialize;

use crate::bus::Bus;
use crate::entity::{Entity, Ref};
use crate::error::ArbiterError;
use crate::event::{CancellationToken, Event, EntityHandle};
use crate::topics::{self, keys};

/// Sentinel trigger-map value meaning "restore to full" in
/// [`Resource::restore_on_trigger`].
pub const RESTORE_TO_FULL: i64 = -1;

/// `{ref, current, maximum, triggers}` — the persisted shape the design doc
/// allows a resource to expose, mirroring
/// [`crate::effect_core::EffectCoreSnapshot`]. The core imposes no
/// serialization format beyond this; consumers decide how (or whether) to
/// persist it.
#[derive(Debug, Serialize)]
pub struct ResourceSnapshot {
    #[serde(rename = "ref")]
    pub ref_: String,
    pub current: i64,
    pub maximum: i64,
    pub triggers: HashMap<String, i64>,
}

/// `{ref, current, maximum, restoration-trigger-map}`. `0 <= current <=
/// maximum` holds after every operation; consumption below zero fails;
/// restoration saturates at `maximum`.
#[derive(Debug, Clone)]
pub struct Resource {
    ref_: Ref,
    current: i64,
    maximum: i64,
    triggers: HashMap<String, i64>,
}

impl Resource {
    pub fn new(ref_: Ref, current: i64, maximum: i64) -> Self {
        Self {
            ref_,
            current: current.clamp(0, maximum.max(0)),
            maximum: maximum.max(0),
            triggers: HashMap::new(),
        }
    }

    /// Register a trigger. `-1` ([`RESTORE_TO_FULL`]) means "restore to
    /// full"; `0` means "do not respond"; positive means "restore that
    /// many". The trigger vocabulary is open-ended and game-defined — the
    /// core does not hardcode `"short_rest"`/`"long_rest"` or any other
    /// name.
    pub fn with_trigger(mut self, trigger: impl Into<String>, amount: i64) -> Self {
        self.triggers.insert(trigger.into(), amount);
        self
    }

    pub fn ref_(&self) -> &Ref {
        &self.ref_
    }

    pub fn current(&self) -> i64 {
        self.current
    }

    pub fn maximum(&self) -> i64 {
        self.maximum
    }

    pub fn is_available(&self) -> bool {
        self.current > 0
    }

    pub fn consume(&mut self, n: i64) -> Result<(), ArbiterError> {
        if n < 0 {
            return Err(ArbiterError::NegativeAmount(n));
        }
        if n > self.current {
            return Err(ArbiterError::InsufficientResource {
                requested: n,
                available: self.current,
            });
        }
        self.current -= n;
        Ok(())
    }

    /// Negative amounts are ignored; positive amounts saturate at `maximum`.
    pub fn restore(&mut self, n: i64) {
        if n < 0 {
            return;
        }
        self.current = (self.current + n).min(self.maximum);
    }

    pub fn set_current(&mut self, v: i64) {
        self.current = v.clamp(0, self.maximum);
    }

    /// Floors at 0, then clamps `current` to the new maximum.
    pub fn set_maximum(&mut self, v: i64) {
        self.maximum = v.max(0);
        self.current = self.current.min(self.maximum);
    }

    /// `0` if `trigger` is absent from the map; `maximum - current` if the
    /// mapped value is `-1`; otherwise the mapped positive amount.
    pub fn restore_on_trigger(&self, trigger: &str) -> i64 {
        match self.triggers.get(trigger) {
            None => 0,
            Some(&RESTORE_TO_FULL) => self.maximum - self.current,
            Some(&amount) => amount,
        }
    }

    pub fn snapshot(&self) -> ResourceSnapshot {
        ResourceSnapshot {
            ref_: self.ref_.to_string(),
            current: self.current,
            maximum: self.maximum,
            triggers: self.triggers.clone(),
        }
    }
}

/// `{ref, count, limit}`. `limit == 0` means unbounded.
#[derive(Debug, Clone)]
pub struct Counter {
    ref_: Ref,
    count: i64,
    limit: i64,
}

impl Counter {
    pub fn new(ref_: Ref, limit: i64) -> Self {
        Self {
            ref_,
            count: 0,
            limit: limit.max(0),
        }
    }

    pub fn ref_(&self) -> &Ref {
        &self.ref_
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn increment(&mut self) -> Result<(), ArbiterError> {
        self.increment_by(1)
    }

    pub fn increment_by(&mut self, n: i64) -> Result<(), ArbiterError> {
        if self.limit > 0 && self.count + n > self.limit {
            return Err(ArbiterError::CounterLimitExceeded {
                limit: self.limit,
                by: n,
            });
        }
        self.count += n;
        Ok(())
    }

    pub fn decrement(&mut self) {
        self.decrement_by(1)
    }

    /// Silently floors at zero.
    pub fn decrement_by(&mut self, n: i64) {
        self.count = (self.count - n).max(0);
    }

    pub fn set_count(&mut self, v: i64) {
        self.count = if self.limit > 0 {
            v.clamp(0, self.limit)
        } else {
            v.max(0)
        };
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}

/// Per-owner container of [`Resource`]s and [`Counter`]s with group
/// restoration. A resource's ref is expected to name its owner in the
/// module token (e.g. `hero:resource:ki-point`) — adding a resource whose
/// module token disagrees with the pool's owner id fails, per the data
/// model's ownership invariant.
pub struct Pool {
    owner: EntityHandle,
    resources: HashMap<String, Resource>,
    counters: HashMap<String, Counter>,
}

impl Pool {
    pub fn new(owner: EntityHandle) -> Self {
        Self {
            owner,
            resources: HashMap::new(),
            counters: HashMap::new(),
        }
    }

    pub fn owner(&self) -> &EntityHandle {
        &self.owner
    }

    fn check_owner(&self, ref_: &Ref) -> Result<(), ArbiterError> {
        if ref_.module() != self.owner.id() {
            return Err(ArbiterError::PoolOwnerMismatch {
                owner: ref_.module().to_string(),
                pool_owner: self.owner.id().to_string(),
            });
        }
        Ok(())
    }

    /// Fails if `resource`'s owner token doesn't match the pool's owner.
    /// Re-adding an existing key replaces it.
    pub fn add_resource(&mut self, resource: Resource) -> Result<(), ArbiterError> {
        self.check_owner(resource.ref_())?;
        self.resources.insert(resource.ref_().to_string(), resource);
        Ok(())
    }

    pub fn add_counter(&mut self, counter: Counter) -> Result<(), ArbiterError> {
        self.check_owner(counter.ref_())?;
        self.counters.insert(counter.ref_().to_string(), counter);
        Ok(())
    }

    pub fn resource(&self, ref_: &Ref) -> Option<&Resource> {
        self.resources.get(&ref_.to_string())
    }

    pub fn resource_mut(&mut self, ref_: &Ref) -> Option<&mut Resource> {
        self.resources.get_mut(&ref_.to_string())
    }

    pub fn remove_resource(&mut self, ref_: &Ref) -> Option<Resource> {
        self.resources.remove(&ref_.to_string())
    }

    pub fn counter(&self, ref_: &Ref) -> Option<&Counter> {
        self.counters.get(&ref_.to_string())
    }

    pub fn counter_mut(&mut self, ref_: &Ref) -> Option<&mut Counter> {
        self.counters.get_mut(&ref_.to_string())
    }

    pub fn remove_counter(&mut self, ref_: &Ref) -> Option<Counter> {
        self.counters.remove(&ref_.to_string())
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Consumes `n` from the resource at `ref_` and, on success, publishes
    /// `resource.consumed` with the pool's owner as source.
    pub fn consume(&mut self, ref_: &Ref, n: i64, bus: &Bus) -> Result<(), ArbiterError> {
        let resource = self
            .resources
            .get_mut(&ref_.to_string())
            .ok_or_else(|| ArbiterError::ResourceNotFound(ref_.to_string()))?;
        resource.consume(n)?;
        self.publish_consumed(ref_, n, bus);
        Ok(())
    }

    /// Restores `amount` into the resource at `ref_`. Publishes
    /// `resource.restored` only if `current` actually changed.
    pub fn restore(
        &mut self,
        ref_: &Ref,
        amount: i64,
        reason: &str,
        bus: &Bus,
    ) -> Result<(), ArbiterError> {
        let resource = self
            .resources
            .get_mut(&ref_.to_string())
            .ok_or_else(|| ArbiterError::ResourceNotFound(ref_.to_string()))?;
        let before = resource.current();
        resource.restore(amount);
        let delta = resource.current() - before;
        if delta != 0 {
            self.publish_restored(ref_, delta, reason, bus);
        }
        Ok(())
    }

    /// Iterates every resource, asks each for `restore_on_trigger(trigger)`,
    /// and restores by that amount. Publishes `resource.restored` for each
    /// resource whose current value actually changed.
    pub fn process_restoration(&mut self, trigger: &str, bus: &Bus) {
        let refs: Vec<Ref> = self.resources.values().map(|r| r.ref_().clone()).collect();
        for ref_ in refs {
            let amount = self
                .resources
                .get(&ref_.to_string())
                .map(|r| r.restore_on_trigger(trigger))
                .unwrap_or(0);
            if amount > 0 {
                self.restore(&ref_, amount, trigger, bus).ok();
            }
        }
    }

    fn publish_consumed(&self, ref_: &Ref, amount: i64, bus: &Bus) {
        let mut event: Event<topics::ResourceConsumed> =
            Event::new(topics::RESOURCE_CONSUMED.key).with_source(self.owner.clone());
        event.context_mut().set_string(keys::RESOURCE_REF, ref_.to_string());
        event.context_mut().set_int(keys::AMOUNT, amount);
        bus.publish(&CancellationToken::new(), &mut event);
    }

    fn publish_restored(&self, ref_: &Ref, amount: i64, reason: &str, bus: &Bus) {
        let mut event: Event<topics::ResourceRestored> =
            Event::new(topics::RESOURCE_RESTORED.key).with_source(self.owner.clone());
        event.context_mut().set_string(keys::RESOURCE_REF, ref_.to_string());
        event.context_mut().set_int(keys::AMOUNT, amount);
        event.context_mut().set_string(keys::TRIGGER, reason);
        bus.publish(&CancellationToken::new(), &mut event);
    }
}

/// `ConsumeSpellSlot(level, bus)`: tries the resource at the exact level
/// first; if unavailable, scans higher-level spell-slot resources actually
/// present in the pool, in ascending order, and consumes the first
/// available. Spell-slot resources are expected to be keyed
/// `{owner}:spell-slot:{level}`; the scan's upper bound comes from the
/// pool's own contents, not a caller-supplied guess, so a slot the caller
/// didn't know about is never missed.
pub fn consume_spell_slot(
    pool: &mut Pool,
    owner_id: &str,
    level: u8,
    bus: &Bus,
) -> Result<u8, ArbiterError> {
    let mut candidate_levels: Vec<u8> = pool
        .resources()
        .filter(|r| r.ref_().module() == owner_id && r.ref_().type_tag() == "spell-slot")
        .filter_map(|r| r.ref_().value().parse::<u8>().ok())
        .filter(|&candidate| candidate >= level)
        .collect();
    candidate_levels.sort_unstable();
    candidate_levels.dedup();

    for candidate in candidate_levels {
        let ref_ = Ref::new(owner_id, "spell-slot", candidate.to_string())
            .expect("owner_id and level are always non-empty");
        let available = pool.resource(&ref_).map(Resource::is_available).unwrap_or(false);
        if available {
            pool.consume(&ref_, 1, bus)?;
            return Ok(candidate);
        }
    }
    Err(ArbiterError::NoSpellSlotAvailable(level))
}
