// src/exit.rs
//! Process exit codes for `layerfix`.
//!
//! Provides a stable contract for scripts and CI.

use std::process::Termination;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum LayerfixExit {
    /// Every layer on every file was accepted or skipped.
    Success = 0,
    /// Generic error (I/O, config).
    Error = 1,
    /// Input could not be processed at all (binary, oversized, no valid layers).
    InvalidInput = 2,
    /// At least one layer failed to execute.
    LayersFailed = 3,
    /// At least one layer was reverted by the validator, none failed.
    RevertsOccurred = 4,
}

impl LayerfixExit {
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Worst outcome wins: failures over reverts over success.
    #[must_use]
    pub fn from_outcomes(any_failed: bool, any_reverted: bool) -> Self {
        if any_failed {
            Self::LayersFailed
        } else if any_reverted {
            Self::RevertsOccurred
        } else {
            Self::Success
        }
    }
}

impl Termination for LayerfixExit {
    fn report(self) -> std::process::ExitCode {
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        std::process::ExitCode::from(self.code() as u8)
    }
}
