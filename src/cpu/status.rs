//! Stop reasons and the per-order status flags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why the machine stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StopReason {
    /// Invalid order, unconditional halt, or a counter or address outside
    /// the store. Needs a reset.
    Absolute,
    /// The program asked to stop. The host may resume.
    Normal,
    /// Arithmetic or shift overflow in M, L or D. Execution may continue.
    RecoverableOverflow,
    /// Overflow in S, or an arithmetic left shift past the accumulator.
    IrrecoverableOverflow,
    /// An order whose behaviour has not been specified (35, 58).
    Unspecified,
}

impl StopReason {
    /// Fatal stops refuse further orders until the machine is reset.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            StopReason::Absolute | StopReason::IrrecoverableOverflow | StopReason::Unspecified
        )
    }

    /// Whether a free-running host loop should pause here.
    pub fn halts_run(self) -> bool {
        self != StopReason::RecoverableOverflow
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopReason::Absolute => "absolute stop",
            StopReason::Normal => "normal stop",
            StopReason::RecoverableOverflow => "recoverable overflow",
            StopReason::IrrecoverableOverflow => "irrecoverable overflow",
            StopReason::Unspecified => "unspecified order",
        })
    }
}

/// Status left behind by the most recent order.
///
/// Reset before every order; modifier orders and a no-op stop check put
/// back what was there before them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub stop_reason: Option<StopReason>,
    pub overflowed: bool,
    pub underflowed: bool,
}

impl Status {
    /// Record an overflow or underflow and the recoverable stop it implies.
    pub fn record_recoverable(&mut self, overflowed: bool, underflowed: bool) {
        self.overflowed |= overflowed;
        self.underflowed |= underflowed;
        if overflowed || underflowed {
            self.stop_reason = Some(StopReason::RecoverableOverflow);
        }
    }

    /// Record an overflow the program cannot continue past.
    pub fn record_irrecoverable(&mut self) {
        self.overflowed = true;
        self.stop_reason = Some(StopReason::IrrecoverableOverflow);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_reasons() {
        assert!(StopReason::Absolute.is_fatal());
        assert!(StopReason::IrrecoverableOverflow.is_fatal());
        assert!(StopReason::Unspecified.is_fatal());
        assert!(!StopReason::Normal.is_fatal());
        assert!(!StopReason::RecoverableOverflow.is_fatal());
    }

    #[test]
    fn test_record_recoverable() {
        let mut status = Status::default();
        status.record_recoverable(false, false);
        assert_eq!(status, Status::default());

        status.record_recoverable(false, true);
        assert!(status.underflowed);
        assert!(!status.overflowed);
        assert_eq!(status.stop_reason, Some(StopReason::RecoverableOverflow));
    }
}
