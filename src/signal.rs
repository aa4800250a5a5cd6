//! The protocol between strands and the scheduler.
//!
//! At every suspension point a strand reports a [`YieldSignal`], and the
//! driver interprets it: re-enqueue at some due time, park until an
//! explicit wake, retire, or halt the whole run. A strand's observable
//! state is always exactly one signal, and it changes only as a direct
//! result of resuming that strand — the single exception being a
//! suspended strand re-entering the queue through an explicit wake.

use std::fmt;
use std::time::Duration;

use crate::error::Fault;
use crate::types::Time;

/// What a strand reports at a suspension point.
#[derive(Debug, Clone)]
pub enum YieldSignal {
    /// Rerun as soon as possible.
    Resume,
    /// Rerun after the duration has elapsed on the active clock.
    ResumeAfter(Duration),
    /// Rerun after the duration has elapsed on the wall clock, even when
    /// the active clock is virtual. Lets a simulation honor real timers.
    ResumeAfterReal(Duration),
    /// Rerun at an absolute timestamp on the active clock.
    ResumeAt(Time),
    /// Blocked; only an explicit wake re-enqueues this strand.
    Suspend,
    /// Nothing left to produce; retire without error.
    Finished,
    /// The computation failed; halt the run and surface the fault.
    Exception(Fault),
    /// Cooperative stop request: halt the run without error.
    Shutdown,
    /// Unconditional stop request: halt the run immediately, without error.
    Terminate,
}

impl YieldSignal {
    /// The fieldless mirror of this signal.
    #[must_use]
    pub const fn kind(&self) -> SignalKind {
        match self {
            Self::Resume => SignalKind::Resume,
            Self::ResumeAfter(_) => SignalKind::ResumeAfter,
            Self::ResumeAfterReal(_) => SignalKind::ResumeAfterReal,
            Self::ResumeAt(_) => SignalKind::ResumeAt,
            Self::Suspend => SignalKind::Suspend,
            Self::Finished => SignalKind::Finished,
            Self::Exception(_) => SignalKind::Exception,
            Self::Shutdown => SignalKind::Shutdown,
            Self::Terminate => SignalKind::Terminate,
        }
    }

    /// True once the strand can never run again.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Finished | Self::Exception(_) | Self::Shutdown | Self::Terminate
        )
    }

    /// True if the signal asks to be scheduled again.
    #[must_use]
    pub const fn is_runnable(&self) -> bool {
        matches!(
            self,
            Self::Resume | Self::ResumeAfter(_) | Self::ResumeAfterReal(_) | Self::ResumeAt(_)
        )
    }
}

impl fmt::Display for YieldSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResumeAfter(d) => write!(f, "resume-after {d:?}"),
            Self::ResumeAfterReal(d) => write!(f, "resume-after-real {d:?}"),
            Self::ResumeAt(tp) => write!(f, "resume-at {tp}"),
            Self::Exception(fault) => write!(f, "exception: {fault}"),
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// Fieldless mirror of [`YieldSignal`] for comparisons and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SignalKind {
    /// See [`YieldSignal::Resume`].
    Resume,
    /// See [`YieldSignal::ResumeAfter`].
    ResumeAfter,
    /// See [`YieldSignal::ResumeAfterReal`].
    ResumeAfterReal,
    /// See [`YieldSignal::ResumeAt`].
    ResumeAt,
    /// See [`YieldSignal::Suspend`].
    Suspend,
    /// See [`YieldSignal::Finished`].
    Finished,
    /// See [`YieldSignal::Exception`].
    Exception,
    /// See [`YieldSignal::Shutdown`].
    Shutdown,
    /// See [`YieldSignal::Terminate`].
    Terminate,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resume => "resume",
            Self::ResumeAfter => "resume-after",
            Self::ResumeAfterReal => "resume-after-real",
            Self::ResumeAt => "resume-at",
            Self::Suspend => "suspend",
            Self::Finished => "finished",
            Self::Exception => "exception",
            Self::Shutdown => "shutdown",
            Self::Terminate => "terminate",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_mirror_variants() {
        assert_eq!(YieldSignal::Resume.kind(), SignalKind::Resume);
        assert_eq!(
            YieldSignal::ResumeAfter(Duration::from_millis(1)).kind(),
            SignalKind::ResumeAfter
        );
        assert_eq!(
            YieldSignal::ResumeAt(Time::from_millis(5)).kind(),
            SignalKind::ResumeAt
        );
        assert_eq!(
            YieldSignal::Exception(Fault::new("x")).kind(),
            SignalKind::Exception
        );
    }

    #[test]
    fn terminal_and_runnable_partition() {
        let signals = [
            YieldSignal::Resume,
            YieldSignal::ResumeAfter(Duration::ZERO),
            YieldSignal::ResumeAfterReal(Duration::ZERO),
            YieldSignal::ResumeAt(Time::ZERO),
            YieldSignal::Suspend,
            YieldSignal::Finished,
            YieldSignal::Exception(Fault::new("x")),
            YieldSignal::Shutdown,
            YieldSignal::Terminate,
        ];
        for signal in signals {
            // Suspend is the only state that is neither runnable nor terminal.
            assert_eq!(
                signal.is_runnable() || signal.is_terminal(),
                !matches!(signal, YieldSignal::Suspend),
                "partition violated for {signal}"
            );
        }
    }

    #[test]
    fn display_names() {
        assert_eq!(YieldSignal::Resume.to_string(), "resume");
        assert_eq!(
            YieldSignal::ResumeAt(Time::from_millis(3)).to_string(),
            "resume-at 3ms"
        );
        assert_eq!(
            YieldSignal::Exception(Fault::new("boom")).to_string(),
            "exception: boom"
        );
        assert_eq!(SignalKind::Terminate.to_string(), "terminate");
    }
}
