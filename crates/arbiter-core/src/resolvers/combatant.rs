//! The resolver-facing contract a consumer's character/monster type must
//! satisfy, plus the lookup seam resolvers use instead of owning a registry
//! themselves.

use std::collections::HashMap;

use crate::entity::Entity;

/// A single instance of damage to apply, e.g. `{amount: 11, descriptor:
/// "slashing"}`. Kept deliberately thin — resistance/vulnerability math
/// beyond what the damage chain already resolved belongs to the Combatant
/// implementation, not the core.
#[derive(Debug, Clone)]
pub struct DamageInstance {
    pub amount: i64,
    pub descriptor: String,
}

/// What applying damage did to a combatant.
#[derive(Debug, Clone, Copy)]
pub struct DamageResult {
    pub applied: i64,
    pub hit_points_remaining: i32,
}

/// Entity plus the accessors resolvers need: AC, hit points, ability
/// scores, proficiency bonus, and damage application. Resolvers never
/// mutate combatant state directly except through `apply_damage`.
pub trait Combatant: Entity {
    fn ac(&self) -> i32;
    fn hit_points(&self) -> i32;
    fn max_hit_points(&self) -> i32;
    fn ability_scores(&self) -> &HashMap<String, i32>;
    fn proficiency_bonus(&self) -> i32;
    fn apply_damage(&mut self, instances: &[DamageInstance]) -> DamageResult;
}

/// Resolvers look up combatants by id through a registry injected by the
/// caller — the bus carries no registry of its own.
pub trait CombatantRegistry {
    fn get(&self, id: &str) -> Option<&dyn Combatant>;
    fn get_mut(&mut self, id: &str) -> Option<&mut dyn Combatant>;
}
