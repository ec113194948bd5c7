//! Consumer-style proficiency rules built from `EffectCore`, exercising
//! scenarios S2–S4: the core ships no weapon/skill/save rulebook, so these
//! fixtures are test-only and deliberately not exported from the crate.

use std::sync::Arc;

use arbiter_core::context::{kinds, Modifier};
use arbiter_core::{Bus, CancellationToken, EffectCore, Entity, EntityRef, Event};
use arbiter_core::{topics, EntityHandle};

/// `2 + (level - 1) / 4`, the formula spec.md §8 S2 names directly.
fn proficiency_bonus(level: u32) -> i64 {
    2 + ((level - 1) / 4) as i64
}

/// A weapon (or weapon-category) proficiency: adds `attack_bonus` on
/// `attack.before` when the event's source is the owning character and the
/// weapon in context matches. Category matching is supplied by the caller
/// as a predicate, per spec.md §9's instruction that the core must not
/// bake in a ruleset's ON weapon table.
struct WeaponProficiency {
    core: EffectCore,
}

impl WeaponProficiency {
    fn new(
        owner_id: impl Into<String>,
        level: u32,
        matches: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        let owner_id = owner_id.into();
        let bonus = proficiency_bonus(level);
        let owner_for_hook = owner_id.clone();
        let matches: Arc<dyn Fn(&str) -> bool + Send + Sync> = Arc::new(matches);
        let matches_for_hook = matches.clone();
        let core = EffectCore::new(format!("{owner_id}:weapon-proficiency"), "proficiency", "weapon")
            .with_on_apply(move |sub| {
                let owner_for_handler = owner_for_hook.clone();
                let matches_for_handler = matches_for_hook.clone();
                sub.subscribe(topics::ATTACK_BEFORE, 0, move |_cancel, event| {
                    let is_owner = event
                        .source()
                        .map(|s| s.id() == owner_for_handler)
                        .unwrap_or(false);
                    let weapon_matches = event
                        .context()
                        .get_string("weapon")
                        .map(|w| matches_for_handler(w))
                        .unwrap_or(false);
                    if is_owner && weapon_matches {
                        event.context_mut().add_modifier(Modifier::new(
                            "weapon-proficiency",
                            kinds::ATTACK_BONUS,
                            bonus,
                            0,
                        ));
                    }
                    Ok(())
                })
                .map(|_| ())
            });
        Self { core }
    }

    fn apply(&mut self, bus: &Bus) {
        self.core.apply(bus).unwrap();
    }
}

/// A saving-throw proficiency: adds `save_bonus` on `saving-throw` when the
/// event's source is the owner and the ability in context matches.
struct SavingThrowProficiency {
    core: EffectCore,
}

impl SavingThrowProficiency {
    fn new(owner_id: impl Into<String>, ability: impl Into<String>, level: u32) -> Self {
        let owner_id = owner_id.into();
        let ability = ability.into();
        let bonus = proficiency_bonus(level);
        let owner_for_hook = owner_id.clone();
        let core = EffectCore::new(format!("{owner_id}:save-proficiency"), "proficiency", "save")
            .with_on_apply(move |sub| {
                let owner_for_handler = owner_for_hook.clone();
                let ability_for_handler = ability.clone();
                sub.subscribe(topics::SAVING_THROW, 0, move |_cancel, event| {
                    let is_owner = event
                        .source()
                        .map(|s| s.id() == owner_for_handler)
                        .unwrap_or(false);
                    let ability_matches = event
                        .context()
                        .get_string("ability")
                        .map(|a| a == ability_for_handler)
                        .unwrap_or(false);
                    if is_owner && ability_matches {
                        event.context_mut().add_modifier(Modifier::new(
                            "save-proficiency",
                            kinds::SAVE_BONUS,
                            bonus,
                            0,
                        ));
                    }
                    Ok(())
                })
                .map(|_| ())
            });
        Self { core }
    }

    fn apply(&mut self, bus: &Bus) {
        self.core.apply(bus).unwrap();
    }
}

fn hero() -> EntityHandle {
    Arc::new(EntityRef::new("hero", "character"))
}

/// S1 restated at the integration level: three handlers at priorities
/// 10/100/50 run in ascending order with a FIFO tiebreak.
#[test]
fn s1_priority_ordering_across_independently_registered_handlers() {
    let bus = Bus::new();
    let topic: arbiter_core::Topic<()> = arbiter_core::Topic::new("test.s1");
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));

    for priority in [100, 10, 50] {
        let order = order.clone();
        bus.subscribe(topic, priority, move |_c, _e| {
            order.lock().unwrap().push(priority);
            Ok(())
        })
        .unwrap();
    }

    let mut event: Event<()> = Event::new(topic.key);
    bus.publish(&CancellationToken::new(), &mut event);
    assert_eq!(*order.lock().unwrap(), vec![10, 50, 100]);
}

/// S2: weapon proficiency at level 5 (+3) adds exactly one attack_bonus
/// modifier for a matching weapon.
#[test]
fn s2_weapon_proficiency_adds_attack_bonus_at_level_5() {
    let bus = Bus::new();
    let mut proficiency =
        WeaponProficiency::new("hero", 5, |weapon| weapon == "longsword");
    proficiency.apply(&bus);

    let mut event: Event<topics::AttackBefore> = Event::new(topics::ATTACK_BEFORE.key)
        .with_source(hero());
    event.context_mut().set_string("weapon", "longsword");
    bus.publish(&CancellationToken::new(), &mut event);

    let modifiers = event.context().modifiers();
    assert_eq!(modifiers.len(), 1);
    assert_eq!(modifiers[0].source_tag, "weapon-proficiency");
    assert_eq!(modifiers[0].flat_value(), Some(3));
}

/// S3: category proficiency (here: "simple-weapons") matches a dagger but
/// not a greatsword.
#[test]
fn s3_weapon_category_proficiency_matches_by_predicate() {
    let simple_weapons = |weapon: &str| matches!(weapon, "dagger" | "club" | "quarterstaff");

    let bus_hit = Bus::new();
    let mut proficiency = WeaponProficiency::new("hero", 5, simple_weapons);
    proficiency.apply(&bus_hit);
    let mut hit_event: Event<topics::AttackBefore> =
        Event::new(topics::ATTACK_BEFORE.key).with_source(hero());
    hit_event.context_mut().set_string("weapon", "dagger");
    bus_hit.publish(&CancellationToken::new(), &mut hit_event);
    assert_eq!(hit_event.context().modifiers().len(), 1);

    let bus_miss = Bus::new();
    let mut proficiency = WeaponProficiency::new("hero", 5, simple_weapons);
    proficiency.apply(&bus_miss);
    let mut miss_event: Event<topics::AttackBefore> =
        Event::new(topics::ATTACK_BEFORE.key).with_source(hero());
    miss_event.context_mut().set_string("weapon", "greatsword");
    bus_miss.publish(&CancellationToken::new(), &mut miss_event);
    assert!(miss_event.context().modifiers().is_empty());
}

/// S4: saving-throw proficiency in wisdom at level 8 (+3) gates on the
/// ability named in context.
#[test]
fn s4_saving_throw_proficiency_gates_on_ability() {
    let bus = Bus::new();
    let mut proficiency = SavingThrowProficiency::new("hero", "wisdom", 8);
    proficiency.apply(&bus);

    let mut wis_event: Event<topics::SavingThrow> =
        Event::new(topics::SAVING_THROW.key).with_source(hero());
    wis_event.context_mut().set_string("ability", "wisdom");
    bus.publish(&CancellationToken::new(), &mut wis_event);
    assert_eq!(wis_event.context().modifiers().len(), 1);
    assert_eq!(wis_event.context().modifiers()[0].flat_value(), Some(3));

    let mut str_event: Event<topics::SavingThrow> =
        Event::new(topics::SAVING_THROW.key).with_source(hero());
    str_event.context_mut().set_string("ability", "strength");
    bus.publish(&CancellationToken::new(), &mut str_event);
    assert!(str_event.context().modifiers().is_empty());
}
