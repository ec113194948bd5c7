//! Orchestrators that drive a fixed topic sequence through the bus and
//! reduce the resulting `Context` modifiers into a concrete outcome.
//!
//! Resolvers own no state of their own beyond the bus and roller references
//! they're constructed with; combatant state lives behind an
//! injected [`combatant::CombatantRegistry`].

pub mod attack;
pub mod combatant;
pub mod movement;
pub mod roller;

pub use attack::{AttackOutcome, AttackResolver};
pub use combatant::{Combatant, CombatantRegistry, DamageInstance, DamageResult};
pub use movement::{GridPosition, MovementOutcome, MovementResolver};
pub use roller::Roller;

#[cfg(feature = "fastrand-roller")]
pub use roller::FastrandRoller;
