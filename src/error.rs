//! Failure payloads and typed API errors.
//!
//! A strand that fails reports [`YieldSignal::Exception`] carrying a
//! [`Fault`]: a diagnostic string plus an optional opaque payload the
//! scheduler never interprets. Panics escaping a continuation are caught
//! at the resumption boundary and converted into faults, so a buggy
//! strand halts the run instead of unwinding through the driver.
//!
//! [`YieldSignal::Exception`]: crate::signal::YieldSignal::Exception

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::types::StrandId;

/// An opaque failure reported by a strand.
///
/// The scheduler treats the payload as a black box: it is captured on the
/// first `Exception`, surfaced through [`Scheduler::fault`], and only the
/// [`description`](Fault::description) is used for diagnostics.
///
/// [`Scheduler::fault`]: crate::sched::Scheduler::fault
#[derive(thiserror::Error)]
#[error("{description}")]
pub struct Fault {
    description: String,
    payload: Option<Arc<dyn Any + Send>>,
}

impl Fault {
    /// Creates a fault with a diagnostic description and no payload.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            payload: None,
        }
    }

    /// Creates a fault carrying an opaque payload value.
    #[must_use]
    pub fn with_payload<T: Any + Send>(description: impl Into<String>, payload: T) -> Self {
        Self {
            description: description.into(),
            payload: Some(Arc::new(payload)),
        }
    }

    /// Converts a caught panic payload into a fault.
    ///
    /// The description is recovered from `&str`/`String` panic messages;
    /// other payload types are kept opaque.
    #[must_use]
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let description = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "strand panicked".to_string()
        };
        Self {
            description,
            payload: Some(Arc::from(payload)),
        }
    }

    /// The diagnostic text.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The opaque payload, if one was attached.
    #[must_use]
    pub fn payload(&self) -> Option<&(dyn Any + Send)> {
        self.payload.as_deref()
    }

    /// Downcasts the payload to a concrete type.
    #[must_use]
    pub fn downcast_payload<T: Any>(&self) -> Option<&T> {
        self.payload.as_deref().and_then(|p| p.downcast_ref::<T>())
    }
}

impl Clone for Fault {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            payload: self.payload.clone(),
        }
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fault")
            .field("description", &self.description)
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}

/// Error returned when [`Scheduler::wake`] cannot reactivate its target.
///
/// [`Scheduler::wake`]: crate::sched::Scheduler::wake
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WakeError {
    /// No loop-phase strand is registered under the given id.
    #[error("no loop strand registered as {0}")]
    UnknownStrand(StrandId),
    /// The strand exists but is not suspended.
    #[error("strand {0} is not suspended")]
    NotSuspended(StrandId),
}
