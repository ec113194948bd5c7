//! A priority-ordered, typed event bus and the effect-lifecycle, resource,
//! and resolver primitives built on top of it.
//!
//! The bus ([`bus::Bus`]) is the foundation: handlers subscribe to a
//! [`event::Topic`] at a priority and are invoked in ascending-priority,
//! FIFO-tiebreak order against a mutable [`context::Context`] every handler
//! on that publish can see and amend. Everything else in this crate —
//! [`effect_core::EffectCore`]'s subscribe/unsubscribe bookkeeping,
//! [`resources`]'s consumption/restoration primitives, and the
//! [`resolvers`] orchestrators — is built entirely on that one mechanism.
//!
//! Concrete game rules (a specific class feature, a specific condition) are
//! deliberately not part of this crate; it supplies the primitives a
//! consumer assembles them from.

pub mod bus;
pub mod context;
pub mod effect_core;
pub mod entity;
pub mod error;
pub mod event;
pub mod resolvers;
pub mod resources;
pub mod topics;

pub use bus::Bus;
pub use context::{Context, Modifier, ModifierValue};
pub use effect_core::{EffectCore, EffectCoreSnapshot, EffectSubscriber};
pub use entity::{Entity, EntityRef, Ref, RefParseError};
pub use error::{
    ArbiterError, HandlerFailure, HandlerFailureReason, InvariantViolation, PublishFailed,
    PublishOutcome,
};
pub use event::{CancellationToken, Event, EntityHandle, SubscriptionId, Topic, TopicOnBus};
pub use resources::{consume_spell_slot, Counter, Pool, Resource, ResourceSnapshot, RESTORE_TO_FULL};
