//! Attack and damage resolution — the chain described in the design as
//! "diagnostic handlers add raw modifiers first; the resolver transforms
//! them last".

use crate::bus::Bus;
use crate::context::{kinds, ModifierValue};
use crate::entity::Entity;
use crate::error::ArbiterError;
use crate::event::{CancellationToken, Event};
use crate::resolvers::combatant::{CombatantRegistry, DamageInstance};
use crate::resolvers::roller::Roller;
use crate::topics::{self, keys};

/// Outcome of a full attack-and-damage resolution.
#[derive(Debug, Clone)]
pub struct AttackOutcome {
    pub hit: bool,
    pub critical: bool,
    pub natural20: bool,
    /// Every d20 rolled, in roll order (one entry unless advantage or
    /// disadvantage applied, in which case two).
    pub rolls: Vec<i32>,
    pub total_attack: i32,
    pub total_damage: i64,
    /// Human-readable trace of each contribution, in evaluation order.
    pub breakdown: Vec<String>,
}

/// Orchestrates `attack.before` -> roll -> `damage.roll` -> `damage.received`.
pub struct AttackResolver<'a> {
    bus: &'a Bus,
    roller: &'a dyn Roller,
}

impl<'a> AttackResolver<'a> {
    pub fn new(bus: &'a Bus, roller: &'a dyn Roller) -> Self {
        Self { bus, roller }
    }

    /// Resolve an attack from `source` against `target` with `weapon`
    /// stamped into context. Both combatants are looked up through
    /// `registry` by entity id; `apply_damage` is invoked on the target if
    /// the attack hits.
    pub fn resolve(
        &self,
        source: crate::event::EntityHandle,
        target: crate::event::EntityHandle,
        weapon: &str,
        cancellation: &CancellationToken,
        registry: &mut dyn CombatantRegistry,
    ) -> Result<AttackOutcome, ArbiterError> {
        let target_id = target.id().to_string();
        let target_ac = registry
            .get(&target_id)
            .ok_or_else(|| ArbiterError::ResourceNotFound(target_id.clone()))?
            .ac();

        let mut before_event: Event<topics::AttackBefore> = Event::new(topics::ATTACK_BEFORE.key)
            .with_source(source.clone())
            .with_target(target.clone());
        before_event.context_mut().set_string(keys::WEAPON, weapon);
        self.bus.publish(cancellation, &mut before_event);
        let before_ctx = before_event.context();

        let has_advantage = before_ctx.has_modifier_kind(kinds::ADVANTAGE);
        let has_disadvantage = before_ctx.has_modifier_kind(kinds::DISADVANTAGE);
        let attack_bonus = before_ctx.sum_flat(kinds::ATTACK_BONUS) as i32;

        let rolls = match (has_advantage, has_disadvantage) {
            (true, false) => {
                let a = self.roller.roll_d20();
                let b = self.roller.roll_d20();
                vec![a, b]
            }
            (false, true) => {
                let a = self.roller.roll_d20();
                let b = self.roller.roll_d20();
                vec![a, b]
            }
            _ => vec![self.roller.roll_d20()],
        };

        let taken = if has_advantage && !has_disadvantage {
            *rolls.iter().max().unwrap()
        } else if has_disadvantage && !has_advantage {
            *rolls.iter().min().unwrap()
        } else {
            rolls[0]
        };

        let natural20 = taken == 20;
        let natural1 = taken == 1;
        let total_attack = taken + attack_bonus;
        let hit = natural20 || (!natural1 && total_attack >= target_ac);

        let mut breakdown = vec![format!("attack roll {taken} + bonus {attack_bonus} = {total_attack}")];

        if !hit {
            return Ok(AttackOutcome {
                hit: false,
                critical: false,
                natural20,
                rolls,
                total_attack,
                total_damage: 0,
                breakdown,
            });
        }

        let mut damage_event: Event<topics::DamageRoll> = Event::new(topics::DAMAGE_ROLL.key)
            .with_source(source.clone())
            .with_target(target.clone());
        damage_event.context_mut().set_string(keys::WEAPON, weapon);
        damage_event
            .context_mut()
            .set_bool(keys::CRITICAL, natural20);
        self.bus.publish(cancellation, &mut damage_event);
        let damage_ctx = damage_event.context();

        let mut total_damage: i64 = 0;
        for modifier in damage_ctx.modifiers().iter().filter(|m| m.kind == kinds::DAMAGE_BONUS) {
            let value = match &modifier.value {
                ModifierValue::Flat(v) => *v,
                ModifierValue::Roll { dice, .. } => self.roller.roll_dice(dice) as i64,
            };
            breakdown.push(format!("{}: {value}", modifier.source_tag));
            total_damage += value;
        }
        let resistance = damage_ctx.sum_flat(kinds::DAMAGE_RESISTANCE);
        total_damage = (total_damage - resistance).max(0);

        let mut received_event: Event<topics::DamageReceived> =
            Event::new(topics::DAMAGE_RECEIVED.key)
                .with_source(source)
                .with_target(target.clone());
        received_event
            .context_mut()
            .set_int(keys::TOTAL_DAMAGE, total_damage);
        self.bus.publish(cancellation, &mut received_event);

        if let Some(combatant) = registry.get_mut(&target_id) {
            combatant.apply_damage(&[DamageInstance {
                amount: total_damage,
                descriptor: weapon.to_string(),
            }]);
        }

        Ok(AttackOutcome {
            hit: true,
            critical: natural20,
            natural20,
            rolls,
            total_attack,
            total_damage,
            breakdown,
        })
    }
}
