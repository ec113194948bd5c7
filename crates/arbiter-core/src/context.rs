//! The per-event scratchpad: typed key-value store, modifier list, notes.
//!
//! A `Context` is created fresh for each event and lives only as long as the
//! publish that carries it. Because the bus runs handlers sequentially for a
//! given publish (see the bus module), no internal locking is needed here —
//! handlers mutate it directly and see each other's prior mutations.

use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

/// Standard, non-exhaustive modifier kinds. Consumers may use any string;
/// these constants exist so common kinds don't get re-typo'd across rules.
pub mod kinds {
    pub const ATTACK_BONUS: &str = "attack_bonus";
    pub const DAMAGE_BONUS: &str = "damage_bonus";
    /// Saving-throw proficiency bonus.
    pub const SAVE_BONUS: &str = "save_bonus";
    /// Skill-check proficiency bonus, kept distinct from [`SAVE_BONUS`] —
    /// the source data conflated the two under one kind; this taxonomy
    /// keeps both so a resolver can choose deliberately instead of
    /// inheriting that ambiguity.
    pub const SKILL_BONUS: &str = "skill_bonus";
    pub const AC_BONUS: &str = "ac_bonus";
    pub const ADVANTAGE: &str = "advantage";
    pub const DISADVANTAGE: &str = "disadvantage";
    pub const DAMAGE_RESISTANCE: &str = "damage_resistance";
    pub const TRIGGER_OPPORTUNITY_ATTACK: &str = "trigger_opportunity_attack";
    pub const PREVENT_OPPORTUNITY_ATTACK: &str = "prevent_opportunity_attack";
}

/// A modifier's numeric contribution: either a raw integer known at
/// publish time, or a deferred dice expression the resolver must roll.
#[derive(Debug, Clone, PartialEq)]
pub enum ModifierValue {
    Flat(i64),
    Roll {
        /// e.g. `"2d6"`.
        dice: Cow<'static, str>,
        /// e.g. `"fire"`, `"sneak-attack"` — for breakdown/trace purposes.
        descriptor: Cow<'static, str>,
    },
}

impl From<i64> for ModifierValue {
    fn from(v: i64) -> Self {
        ModifierValue::Flat(v)
    }
}

/// An additive contribution to an outcome, appended to a `Context` by a
/// handler. Modifiers are immutable after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Modifier {
    pub source_tag: Cow<'static, str>,
    pub kind: Cow<'static, str>,
    pub value: ModifierValue,
    pub priority: i32,
}

impl Modifier {
    pub fn new(
        source_tag: impl Into<Cow<'static, str>>,
        kind: impl Into<Cow<'static, str>>,
        value: impl Into<ModifierValue>,
        priority: i32,
    ) -> Self {
        Self {
            source_tag: source_tag.into(),
            kind: kind.into(),
            value: value.into(),
            priority,
        }
    }

    /// Only meaningful for [`ModifierValue::Flat`]; `None` for deferred rolls.
    pub fn flat_value(&self) -> Option<i64> {
        match &self.value {
            ModifierValue::Flat(v) => Some(*v),
            ModifierValue::Roll { .. } => None,
        }
    }
}

/// A context-stored value: int/bool/string have dedicated typed accessors;
/// anything else goes through the opaque handle.
enum StoredValue {
    Int(i64),
    Bool(bool),
    String(String),
    Opaque(Arc<dyn Any + Send + Sync>),
}

/// Per-event scratchpad visible to every handler during a single publish.
#[derive(Default)]
pub struct Context {
    values: HashMap<String, StoredValue>,
    modifiers: Vec<Modifier>,
    notes: Vec<String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i64) {
        self.values.insert(key.into(), StoredValue::Int(value));
    }

    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        self.values.insert(key.into(), StoredValue::Bool(value));
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(key.into(), StoredValue::String(value.into()));
    }

    /// Store an arbitrary value behind an opaque handle, retrievable with
    /// [`Context::get_opaque`].
    pub fn set_opaque<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values
            .insert(key.into(), StoredValue::Opaque(Arc::new(value)));
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(StoredValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key) {
            Some(StoredValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(StoredValue::String(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn get_opaque<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        match self.values.get(key) {
            Some(StoredValue::Opaque(v)) => v.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn add_modifier(&mut self, modifier: Modifier) {
        self.modifiers.push(modifier);
    }

    /// Modifiers in insertion order (the order handlers appended them in).
    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    /// Sum of every flat modifier whose kind matches `kind`. Deferred rolls
    /// are excluded — callers that need them should filter `modifiers()`
    /// directly and resolve the rolls themselves.
    pub fn sum_flat(&self, kind: &str) -> i64 {
        self.modifiers
            .iter()
            .filter(|m| m.kind == kind)
            .filter_map(Modifier::flat_value)
            .sum()
    }

    pub fn has_modifier_kind(&self, kind: &str) -> bool {
        self.modifiers.iter().any(|m| m.kind == kind)
    }

    pub fn add_note(&mut self, text: impl Into<String>) {
        self.notes.push(text.into());
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }
}
