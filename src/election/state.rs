//! Election state machine
//!
//! ```text
//! Init → CheckingExisting → AlreadyLeader
//!                         → Acquiring → Leader
//!                                     → Waiting → Acquiring → ...
//! ```
//!
//! AlreadyLeader and Leader are terminal. There is no follower terminal
//! state: a peer that keeps losing stays in the Acquiring/Waiting loop until
//! it wins, fails, or is cancelled.

use std::time::Duration;

/// Election engine state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ElectionState {
    /// Identity resolved, owner reference not yet built.
    #[default]
    Init,

    /// Reading the current lock.
    CheckingExisting,

    /// Attempting atomic lock creation.
    Acquiring {
        /// 1-based create attempt number
        attempt: u32,
    },

    /// Sleeping after a lost create.
    Waiting {
        /// Attempt that was lost
        attempt: u32,
        /// Nominal (pre-jitter) delay
        backoff: Duration,
    },

    /// Lock already carried our owner reference; we were restarted.
    AlreadyLeader,

    /// We created the lock.
    Leader,
}

impl ElectionState {
    /// Stable state name for observability.
    pub fn state_name(&self) -> &'static str {
        match self {
            Self::Init => "Init",
            Self::CheckingExisting => "CheckingExisting",
            Self::Acquiring { .. } => "Acquiring",
            Self::Waiting { .. } => "Waiting",
            Self::AlreadyLeader => "AlreadyLeader",
            Self::Leader => "Leader",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AlreadyLeader | Self::Leader)
    }
}

/// Successful end of an election
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionOutcome {
    /// This process created the lock.
    Leader,
    /// The lock already named this pod; leadership survived a restart.
    AlreadyLeader,
}

impl ElectionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leader => "LEADER",
            Self::AlreadyLeader => "ALREADY_LEADER",
        }
    }

    /// State the engine ends in for this outcome.
    pub fn terminal_state(&self) -> ElectionState {
        match self {
            Self::Leader => ElectionState::Leader,
            Self::AlreadyLeader => ElectionState::AlreadyLeader,
        }
    }
}
