//! Movement resolution: a stepwise walk that gives adjacency/opportunity
//! handlers a chance at each step, synthesizing attacks on behalf of
//! threatening entities unless something suppresses the trigger.

use std::sync::Arc;

use crate::bus::Bus;
use crate::context::kinds;
use crate::entity::{Entity, EntityRef};
use crate::event::{CancellationToken, Event, EntityHandle};
use crate::resolvers::attack::{AttackOutcome, AttackResolver};
use crate::resolvers::combatant::CombatantRegistry;
use crate::resolvers::roller::Roller;
use crate::topics;

/// A single grid position along a movement path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

/// Result of walking a path.
#[derive(Debug)]
pub struct MovementOutcome {
    pub steps_taken: usize,
    pub opportunity_attacks: Vec<AttackOutcome>,
    /// True if movement stopped before exhausting the path because the
    /// mover dropped to 0 hit points.
    pub stopped_early: bool,
}

/// Orchestrates `movement.before-step`, synthesizing opportunity-attack
/// events via an embedded [`AttackResolver`] when a step's trigger survives
/// suppression.
pub struct MovementResolver<'a> {
    bus: &'a Bus,
    attack_resolver: AttackResolver<'a>,
}

impl<'a> MovementResolver<'a> {
    pub fn new(bus: &'a Bus, roller: &'a dyn Roller) -> Self {
        Self {
            bus,
            attack_resolver: AttackResolver::new(bus, roller),
        }
    }

    /// Walk `path`, one `movement.before-step` publish per position.
    /// `weapon` names the threatening entities' assumed weapon for any
    /// synthesized opportunity attack.
    pub fn resolve(
        &self,
        mover: EntityHandle,
        path: &[GridPosition],
        weapon: &str,
        cancellation: &CancellationToken,
        registry: &mut dyn CombatantRegistry,
    ) -> MovementOutcome {
        let mut opportunity_attacks = Vec::new();
        let mut steps_taken = 0;

        for position in path {
            let mut event: Event<topics::MovementBeforeStep> =
                Event::new(topics::MOVEMENT_BEFORE_STEP.key).with_source(mover.clone());
            event.context_mut().set_int("x", position.x as i64);
            event.context_mut().set_int("y", position.y as i64);
            self.bus.publish(cancellation, &mut event);
            steps_taken += 1;

            let ctx = event.context();
            let suppressed = ctx.has_modifier_kind(kinds::PREVENT_OPPORTUNITY_ATTACK);
            if !suppressed {
                let threats: Vec<String> = ctx
                    .modifiers()
                    .iter()
                    .filter(|m| m.kind == kinds::TRIGGER_OPPORTUNITY_ATTACK)
                    .map(|m| m.source_tag.to_string())
                    .collect();
                for threat_id in threats {
                    let threat: EntityHandle = Arc::new(EntityRef::new(&threat_id, "character"));
                    if let Ok(outcome) = self.attack_resolver.resolve(
                        threat,
                        mover.clone(),
                        weapon,
                        cancellation,
                        registry,
                    ) {
                        opportunity_attacks.push(outcome);
                    }
                }
            }

            if let Some(combatant) = registry.get(mover.id()) {
                if combatant.hit_points() <= 0 {
                    return MovementOutcome {
                        steps_taken,
                        opportunity_attacks,
                        stopped_early: true,
                    };
                }
            }
        }

        MovementOutcome {
            steps_taken,
            opportunity_attacks,
            stopped_early: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolvers::combatant::{Combatant, DamageInstance, DamageResult};
    use std::collections::HashMap;

    struct Fighter {
        id: String,
        ac: i32,
        hp: i32,
    }

    impl Entity for Fighter {
        fn id(&self) -> &str {
            &self.id
        }
        fn kind(&self) -> &str {
            "character"
        }
    }

    impl Combatant for Fighter {
        fn ac(&self) -> i32 {
            self.ac
        }
        fn hit_points(&self) -> i32 {
            self.hp
        }
        fn max_hit_points(&self) -> i32 {
            20
        }
        fn ability_scores(&self) -> &HashMap<String, i32> {
            static EMPTY: std::sync::OnceLock<HashMap<String, i32>> = std::sync::OnceLock::new();
            EMPTY.get_or_init(HashMap::new)
        }
        fn proficiency_bonus(&self) -> i32 {
            2
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

    struct MapRegistry(HashMap<String, Fighter>);
    impl CombatantRegistry for MapRegistry {
        fn get(&self, id: &str) -> Option<&dyn Combatant> {
            self.0.get(id).map(|f| f as &dyn Combatant)
        }
        fn get_mut(&mut self, id: &str) -> Option<&mut dyn Combatant> {
            self.0.get_mut(id).map(|f| f as &mut dyn Combatant)
        }
    }

    struct NoRollRoller;
    impl Roller for NoRollRoller {
        fn roll_d20(&self) -> i32 {
            20
        }
        fn roll_dice(&self, _d: &str) -> i32 {
            0
        }
    }

    fn path() -> Vec<GridPosition> {
        vec![GridPosition { x: 1, y: 0 }]
    }

    /// S6 (without Disengaging): an adjacency handler triggers an
    /// opportunity attack, and nothing suppresses it.
    #[test]
    fn adjacency_trigger_without_suppression_synthesizes_one_attack() {
        let bus = Bus::new();
        topics::MOVEMENT_BEFORE_STEP
            .on(&bus)
            .subscribe(0, |_c, event| {
                event.context_mut().add_modifier(crate::context::Modifier::new(
                    "guard",
                    kinds::TRIGGER_OPPORTUNITY_ATTACK,
                    0,
                    0,
                ));
                Ok(())
            })
            .unwrap();

        let roller = NoRollRoller;
        let resolver = MovementResolver::new(&bus, &roller);
        let mover: EntityHandle = Arc::new(EntityRef::new("mover", "character"));
        let mut registry = MapRegistry(HashMap::from([
            ("mover".to_string(), Fighter { id: "mover".into(), ac: 10, hp: 20 }),
            ("guard".to_string(), Fighter { id: "guard".into(), ac: 10, hp: 20 }),
        ]));

        let outcome = resolver.resolve(mover, &path(), "spear", &CancellationToken::new(), &mut registry);
        assert_eq!(outcome.opportunity_attacks.len(), 1);
    }

    /// S6: Disengaging's `prevent_opportunity_attack` suppresses the trigger.
    #[test]
    fn disengaging_suppresses_the_opportunity_attack() {
        let bus = Bus::new();
        topics::MOVEMENT_BEFORE_STEP
            .on(&bus)
            .subscribe(0, |_c, event| {
                event.context_mut().add_modifier(crate::context::Modifier::new(
                    "guard",
                    kinds::TRIGGER_OPPORTUNITY_ATTACK,
                    0,
                    0,
                ));
                Ok(())
            })
            .unwrap();
        topics::MOVEMENT_BEFORE_STEP
            .on(&bus)
            .subscribe(1, |_c, event| {
                event.context_mut().add_modifier(crate::context::Modifier::new(
                    "disengaging",
                    kinds::PREVENT_OPPORTUNITY_ATTACK,
                    0,
                    10,
                ));
                Ok(())
            })
            .unwrap();

        let roller = NoRollRoller;
        let resolver = MovementResolver::new(&bus, &roller);
        let mover: EntityHandle = Arc::new(EntityRef::new("mover", "character"));
        let mut registry = MapRegistry(HashMap::from([
            ("mover".to_string(), Fighter { id: "mover".into(), ac: 10, hp: 20 }),
            ("guard".to_string(), Fighter { id: "guard".into(), ac: 10, hp: 20 }),
        ]));

        let outcome = resolver.resolve(mover, &path(), "spear", &CancellationToken::new(), &mut registry);
        assert!(outcome.opportunity_attacks.is_empty());
    }
}
