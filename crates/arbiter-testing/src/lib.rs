//! Testing utilities for consumers building rules on top of `arbiter-core`.
//!
//! This crate does not itself test the core — its unit tests live alongside
//! the modules they cover — it gives *consumers* deterministic rollers,
//! a spy that records every publish on a bus, and a minimal in-memory
//! combatant registry, so rule authors don't reimplement these fixtures in
//! every downstream crate.
//!
//! # Example
//!
//! ```ignore
//! use arbiter_testing::{ScriptedRoller, SpyBus};
//!
//! let roller = ScriptedRoller::new([18, 4]);
//! let spy = SpyBus::wrap(bus.clone());
//! // ... subscribe rules on spy.bus() as usual ...
//! spy.publish(&cancellation, &mut attack_before_event);
//! spy.assert_published("attack.before");
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use arbiter_core::resolvers::combatant::{Combatant, CombatantRegistry, DamageInstance, DamageResult};
use arbiter_core::resolvers::roller::Roller;
use arbiter_core::{Bus, CancellationToken, Entity, Event, PublishOutcome};

/// A [`Roller`] that plays back a fixed script of values, regardless of
/// whether a call is `roll_d20` or `roll_dice`.
///
/// # Panics
///
/// Panics (via `expect`) if more rolls are requested than were scripted —
/// deliberately, since a resolver consuming more rolls than a test expects
/// is itself a bug worth catching immediately.
pub struct ScriptedRoller(Mutex<VecDeque<i32>>);

impl ScriptedRoller {
    pub fn new(values: impl IntoIterator<Item = i32>) -> Self {
        Self(Mutex::new(values.into_iter().collect()))
    }

    /// Remaining unconsumed rolls.
    pub fn remaining(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

impl Roller for ScriptedRoller {
    fn roll_d20(&self) -> i32 {
        self.0
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedRoller script exhausted")
    }

    fn roll_dice(&self, _dice: &str) -> i32 {
        self.0
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedRoller script exhausted")
    }
}

/// A record of one `publish` observed on a [`SpyBus`].
#[derive(Debug, Clone)]
pub struct RecordedPublish {
    pub topic: &'static str,
}

/// Wraps a [`Bus`] and records every topic published through it, for test
/// assertions that a resolver actually walked the chain it claims to.
///
/// `SpyBus` does not intercept handler dispatch — subscribe directly on
/// [`SpyBus::bus`] as usual — it only wraps the publish entrypoint
/// ([`SpyBus::publish`]) so a test driving events straight at the bus (rather
/// than through a resolver, which always publishes against the plain `Bus`
/// it was constructed with) can observe what fired.
#[derive(Clone)]
pub struct SpyBus {
    bus: Bus,
    published: Arc<Mutex<Vec<RecordedPublish>>>,
}

impl SpyBus {
    pub fn wrap(bus: Bus) -> Self {
        Self {
            bus,
            published: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The underlying bus, for subscribing handlers.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Publish `event` on the wrapped bus and record its topic.
    pub fn publish<T: Send + Sync + 'static>(
        &self,
        cancellation: &CancellationToken,
        event: &mut Event<T>,
    ) -> PublishOutcome {
        let topic = event.topic();
        let outcome = self.bus.publish(cancellation, event);
        self.record(topic);
        outcome
    }

    /// Record that `topic` was published.
    fn record(&self, topic: &'static str) {
        self.published
            .lock()
            .unwrap()
            .push(RecordedPublish { topic });
    }

    pub fn published_topics(&self) -> Vec<&'static str> {
        self.published.lock().unwrap().iter().map(|p| p.topic).collect()
    }

    pub fn was_published(&self, topic: &str) -> bool {
        self.published.lock().unwrap().iter().any(|p| p.topic == topic)
    }

    /// Assert `topic` was published, panicking with the full observed list
    /// otherwise.
    pub fn assert_published(&self, topic: &str) {
        let topics = self.published_topics();
        assert!(
            topics.contains(&topic),
            "expected topic {topic:?} to have been published; observed: {topics:?}"
        );
    }

    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
    }
}

/// A minimal [`Combatant`] fixture: just the fields resolvers read.
#[derive(Debug, Clone)]
pub struct TestCombatant {
    pub id: String,
    pub kind: String,
    pub ac: i32,
    pub hp: i32,
    pub max_hp: i32,
    pub abilities: HashMap<String, i32>,
    pub proficiency_bonus: i32,
}

impl TestCombatant {
    pub fn new(id: impl Into<String>, ac: i32, hp: i32) -> Self {
        Self {
            id: id.into(),
            kind: "character".to_string(),
            ac,
            hp,
            max_hp: hp,
            abilities: HashMap::new(),
            proficiency_bonus: 2,
        }
    }

    pub fn with_ability(mut self, name: impl Into<String>, score: i32) -> Self {
        self.abilities.insert(name.into(), score);
        self
    }

    pub fn with_proficiency_bonus(mut self, bonus: i32) -> Self {
        self.proficiency_bonus = bonus;
        self
    }
}

impl Entity for TestCombatant {
    fn id(&self) -> &str {
        &self.id
    }
    fn kind(&self) -> &str {
        &self.kind
    }
}

impl Combatant for TestCombatant {
    fn ac(&self) -> i32 {
        self.ac
    }
    fn hit_points(&self) -> i32 {
        self.hp
    }
    fn max_hit_points(&self) -> i32 {
        self.max_hp
    }
    fn ability_scores(&self) -> &HashMap<String, i32> {
        &self.abilities
    }
    fn proficiency_bonus(&self) -> i32 {
        self.proficiency_bonus
    }
    fn apply_damage(&mut self, instances: &[DamageInstance]) -> DamageResult {
        let total: i64 = instances.iter().map(|d| d.amount).sum();
        self.hp -= total as i32;
        DamageResult {
            applied: total,
            hit_points_remaining: self.hp,
        }
    }
}

/// An in-memory [`CombatantRegistry`] over [`TestCombatant`]s, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct TestRegistry(HashMap<String, TestCombatant>);

impl TestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, combatant: TestCombatant) -> Self {
        self.0.insert(combatant.id.clone(), combatant);
        self
    }

    pub fn insert(&mut self, combatant: TestCombatant) {
        self.0.insert(combatant.id.clone(), combatant);
    }
}

impl CombatantRegistry for TestRegistry {
    fn get(&self, id: &str) -> Option<&dyn Combatant> {
        self.0.get(id).map(|c| c as &dyn Combatant)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut dyn Combatant> {
        self.0.get_mut(id).map(|c| c as &mut dyn Combatant)
    }
}

/// A fresh, never-cancelled token, for tests that don't exercise
/// cancellation.
pub fn no_cancellation() -> CancellationToken {
    CancellationToken::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_roller_plays_back_in_order() {
        let roller = ScriptedRoller::new([20, 1, 15]);
        assert_eq!(roller.roll_d20(), 20);
        assert_eq!(roller.roll_dice("2d6"), 1);
        assert_eq!(roller.remaining(), 1);
        assert_eq!(roller.roll_d20(), 15);
        assert_eq!(roller.remaining(), 0);
    }

    #[test]
    #[should_panic(expected = "script exhausted")]
    fn scripted_roller_panics_when_exhausted() {
        let roller = ScriptedRoller::new([1]);
        roller.roll_d20();
        roller.roll_d20();
    }

    #[test]
    fn spy_bus_records_topics_actually_published_through_it() {
        let spy = SpyBus::wrap(Bus::new());
        let topic: arbiter_core::Topic<()> = arbiter_core::Topic::new("attack.before");
        spy.bus().subscribe(topic, 0, |_c, _e| Ok(())).unwrap();

        let mut event: Event<()> = Event::new(topic.key);
        spy.publish(&CancellationToken::new(), &mut event);

        assert!(spy.was_published("attack.before"));
        spy.assert_published("attack.before");
        assert!(!spy.was_published("turn.start"));
    }

    #[test]
    fn test_registry_round_trips_combatants() {
        let mut registry = TestRegistry::new().with(TestCombatant::new("hero", 15, 20));
        assert_eq!(registry.get("hero").unwrap().ac(), 15);
        registry
            .get_mut("hero")
            .unwrap()
            .apply_damage(&[DamageInstance {
                amount: 5,
                descriptor: "slashing".to_string(),
            }]);
        assert_eq!(registry.get("hero").unwrap().hit_points(), 15);
        assert!(registry.get("missing").is_none());
    }
}
