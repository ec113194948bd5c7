//! Standard topic declarations owned by the core.
//!
//! The payload types here are zero-sized markers — see [`crate::event::Topic`]
//! for why the actual data a handler sees lives entirely in the event's
//! [`crate::context::Context`] rather than in a distinct payload struct.
//! This list is illustrative, not closed: consumers are free to declare and
//! publish their own topics on the same bus.

use crate::event::Topic;

pub struct AttackBefore;
pub struct AttackAfter;
pub struct DamageRoll;
pub struct DamageReceived;
pub struct AbilityCheck;
pub struct SavingThrow;
pub struct ConditionApplied;
pub struct ConditionRemoved;
pub struct FeatureActivate;
pub struct ResourceConsumed;
pub struct ResourceRestored;
pub struct TurnStart;
pub struct TurnEnd;
pub struct RestShort;
pub struct RestLong;
pub struct MovementBeforeStep;
pub struct MovementStep;
pub struct StrikeExecuted;
pub struct ActionGranted;
pub struct OffHandStrikeRequested;
pub struct OffHandStrikeActivated;

pub const ATTACK_BEFORE: Topic<AttackBefore> = Topic::new("attack.before");
pub const ATTACK_AFTER: Topic<AttackAfter> = Topic::new("attack.after");
pub const DAMAGE_ROLL: Topic<DamageRoll> = Topic::new("damage.roll");
pub const DAMAGE_RECEIVED: Topic<DamageReceived> = Topic::new("damage.received");
pub const ABILITY_CHECK: Topic<AbilityCheck> = Topic::new("ability-check");
pub const SAVING_THROW: Topic<SavingThrow> = Topic::new("saving-throw");
pub const CONDITION_APPLIED: Topic<ConditionApplied> = Topic::new("condition.applied");
pub const CONDITION_REMOVED: Topic<ConditionRemoved> = Topic::new("condition.removed");
pub const FEATURE_ACTIVATE: Topic<FeatureActivate> = Topic::new("feature.activate");
pub const RESOURCE_CONSUMED: Topic<ResourceConsumed> = Topic::new("resource.consumed");
pub const RESOURCE_RESTORED: Topic<ResourceRestored> = Topic::new("resource.restored");
pub const TURN_START: Topic<TurnStart> = Topic::new("turn.start");
pub const TURN_END: Topic<TurnEnd> = Topic::new("turn.end");
pub const REST_SHORT: Topic<RestShort> = Topic::new("rest.short");
pub const REST_LONG: Topic<RestLong> = Topic::new("rest.long");
pub const MOVEMENT_BEFORE_STEP: Topic<MovementBeforeStep> = Topic::new("movement.before-step");
pub const MOVEMENT_STEP: Topic<MovementStep> = Topic::new("movement.step");
pub const STRIKE_EXECUTED: Topic<StrikeExecuted> = Topic::new("strike.executed");
pub const ACTION_GRANTED: Topic<ActionGranted> = Topic::new("action.granted");
pub const OFF_HAND_STRIKE_REQUESTED: Topic<OffHandStrikeRequested> =
    Topic::new("off-hand-strike.requested");
pub const OFF_HAND_STRIKE_ACTIVATED: Topic<OffHandStrikeActivated> =
    Topic::new("off-hand-strike.activated");

/// Context keys the resolvers read and write. Not exhaustive — rules are
/// free to stash whatever else they need in the Context — but keeping the
/// ones the core itself depends on in one place avoids typo drift between
/// `attack.rs` and `movement.rs`.
pub mod keys {
    pub const WEAPON: &str = "weapon";
    pub const ATTACK_ROLL: &str = "attack_roll";
    pub const DAMAGE_ROLL: &str = "damage_roll";
    pub const HIT: &str = "hit";
    pub const CRITICAL: &str = "critical";
    pub const NATURAL_20: &str = "natural_20";
    pub const TOTAL_ATTACK: &str = "total_attack";
    pub const TOTAL_DAMAGE: &str = "total_damage";
    pub const RESOURCE_REF: &str = "resource_ref";
    pub const AMOUNT: &str = "amount";
    pub const TRIGGER: &str = "trigger";
}
