//! Structured error taxonomy.
//!
//! Four categories, matching the contract every caller of this crate relies
//! on: *validation* (malformed input, caught before anything happens),
//! *precondition* (an operation that cannot legally proceed given current
//! state), *propagated* (a handler returned failure during a publish), and
//! *internal* (an invariant violation — these are panic-class and are caught
//! at the bus boundary rather than allowed to unwind past it).

use std::fmt;

use thiserror::Error;

use crate::event::SubscriptionId;

/// Errors returned directly by bus, effect-core, and resource operations.
///
/// These are the *local* failures described in the error design: Subscribe
/// and Unsubscribe fail locally and return the reason; they never become
/// part of a [`PublishOutcome`].
#[derive(Debug, Error)]
pub enum ArbiterError {
    /// A ref did not parse as `module:type:value`.
    #[error("malformed ref: {0}")]
    InvalidRef(#[from] crate::entity::RefParseError),

    /// A topic was registered (or published/subscribed) with a payload type
    /// that disagrees with an earlier registration of the same key.
    #[error("topic {key:?} already registered with a different payload type")]
    TopicTypeMismatch { key: &'static str },

    /// `Unsubscribe` was called with a handle the bus does not recognize.
    /// Reported, not fatal — the caller may have already unsubscribed.
    #[error("unknown subscription handle {0:?}")]
    UnknownSubscription(SubscriptionId),

    /// `Resource::consume` with a negative amount.
    #[error("cannot consume a negative amount ({0})")]
    NegativeAmount(i64),

    /// `Resource::consume(n)` with `n` greater than `current`.
    #[error("cannot consume {requested}, only {available} available")]
    InsufficientResource { requested: i64, available: i64 },

    /// `Counter::increment` (or `increment_by`) past a bounded limit.
    #[error("counter at limit {limit}, cannot increment by {by}")]
    CounterLimitExceeded { limit: i64, by: i64 },

    /// `Pool::add_resource`/`add_counter` with a ref whose owner token
    /// disagrees with the pool's owner.
    #[error("resource owner {owner:?} does not match pool owner {pool_owner:?}")]
    PoolOwnerMismatch { owner: String, pool_owner: String },

    /// `ConsumeSpellSlot` found no available slot at or above the requested
    /// level.
    #[error("no spell slot available at or above level {0}")]
    NoSpellSlotAvailable(u8),

    /// A pool operation named a ref with no matching resource or counter.
    #[error("no resource registered for ref {0:?}")]
    ResourceNotFound(String),
}

/// Why a single handler invocation failed during a publish.
#[derive(Debug)]
pub enum HandlerFailureReason {
    /// The handler returned `Err` with this message.
    Returned(String),
    /// The handler panicked; the bus caught the unwind at its boundary.
    Panicked(String),
}

impl fmt::Display for HandlerFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerFailureReason::Returned(msg) => write!(f, "returned error: {msg}"),
            HandlerFailureReason::Panicked(msg) => write!(f, "panicked: {msg}"),
        }
    }
}

/// One handler's failure, named so a composite publish result can report
/// every failing handler rather than abort on the first.
#[derive(Debug)]
pub struct HandlerFailure {
    pub subscription: SubscriptionId,
    pub topic: &'static str,
    pub reason: HandlerFailureReason,
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "handler {:?} on topic {:?} failed: {}",
            self.subscription, self.topic, self.reason
        )
    }
}

/// The result of a single `Publish` call.
///
/// A publish never aborts partway through a topic's handler list — every
/// registered handler gets its chance, and their failures (if any) are
/// collected here rather than short-circuiting. This mirrors the contract
/// resolvers depend on: the Context reflects whatever survived, and the
/// caller decides what a partial result means for it.
#[derive(Debug, Default)]
pub struct PublishOutcome {
    failures: Vec<HandlerFailure>,
}

impl PublishOutcome {
    pub(crate) fn new(failures: Vec<HandlerFailure>) -> Self {
        Self { failures }
    }

    /// True if every handler on the topic succeeded.
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures collected from handlers that returned an error or panicked.
    pub fn failures(&self) -> &[HandlerFailure] {
        &self.failures
    }

    /// Turn this outcome into a `Result`, discarding which handlers failed
    /// beyond a formatted summary. Prefer inspecting `failures()` directly
    /// when the caller needs to act on individual failures.
    pub fn into_result(self) -> Result<(), PublishFailed> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(PublishFailed {
                failures: self.failures,
            })
        }
    }
}

/// A [`PublishOutcome`] with at least one failure, as an `Error`.
#[derive(Debug, Error)]
pub struct PublishFailed {
    pub failures: Vec<HandlerFailure>,
}

impl fmt::Display for PublishFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} handler(s) failed during publish: ", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

/// Internal invariant violations — panic-class, caught at the bus boundary.
///
/// Unlike [`ArbiterError`], this variant should never occur from correct
/// usage; it exists so the boundary has something concrete to report rather
/// than propagating a raw panic payload.
#[derive(Debug, Error)]
#[error("internal invariant violated: {0}")]
pub struct InvariantViolation(pub String);
