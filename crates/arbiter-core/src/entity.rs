//! Entity identity and the `Ref` naming scheme.
//!
//! The bus never owns application entities (characters, monsters, effects,
//! resources); it only owns subscription records. Anything the bus or a
//! resolver needs to address implements [`Entity`].

use std::fmt;

/// Anything addressable by the bus: a stable id and a type tag.
///
/// Characters, monsters, conditions, features, and resources are all
/// entities. Rule objects typically embed an [`crate::effect_core::EffectCore`]
/// *and* implement `Entity` so handlers can filter events by owner:
/// `event.source().map(Entity::id) == Some(rule.id())`.
pub trait Entity {
    /// Stable identifier, unique within the consumer's namespace.
    fn id(&self) -> &str;
    /// Type tag, e.g. `"character"`, `"condition"`, `"resource"`.
    fn kind(&self) -> &str;
}

/// A bare `Entity` stand-in: an id and a kind, nothing else. Useful when a
/// resolver needs to stamp identity onto an event (e.g. a synthesized
/// opportunity-attack "on behalf of" a threatening combatant known only by
/// id) without needing that combatant's full behavior behind the handle.
#[derive(Debug, Clone)]
pub struct EntityRef {
    id: String,
    kind: String,
}

impl EntityRef {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
        }
    }
}

impl Entity for EntityRef {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        &self.kind
    }
}

/// A structured identifier of the form `module:type:value`.
///
/// Refs are the canonical way rules point at features, conditions, spells,
/// and resources. Two refs are equal iff all three tokens match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ref {
    module: String,
    type_tag: String,
    value: String,
}

/// A ref string did not have exactly three non-empty, colon-separated tokens.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("malformed ref {raw:?}: expected \"module:type:value\"")]
pub struct RefParseError {
    raw: String,
}

impl Ref {
    /// Build a ref directly from its three tokens.
    ///
    /// Fails if any token is empty.
    pub fn new(
        module: impl Into<String>,
        type_tag: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, RefParseError> {
        let module = module.into();
        let type_tag = type_tag.into();
        let value = value.into();
        if module.is_empty() || type_tag.is_empty() || value.is_empty() {
            return Err(RefParseError {
                raw: format!("{module}:{type_tag}:{value}"),
            });
        }
        Ok(Self {
            module,
            type_tag,
            value,
        })
    }

    /// Parse `"module:type:value"`.
    pub fn parse(raw: &str) -> Result<Self, RefParseError> {
        let parts: Vec<&str> = raw.split(':').collect();
        let [module, type_tag, value] = parts[..] else {
            return Err(RefParseError {
                raw: raw.to_string(),
            });
        };
        Self::new(module, type_tag, value)
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.module, self.type_tag, self.value)
    }
}

impl std::str::FromStr for Ref {
    type Err = RefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
