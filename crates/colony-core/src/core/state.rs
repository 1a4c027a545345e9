// crates/colony-core/src/core/state.rs
// ============================================================================
// Module: Colony State Machines
// Description: Executor approval states and process work states.
// Purpose: Provide stable state labels shared by store backends and callers.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! State enums for executors and processes. Labels are lowercase, stable,
//! and used verbatim as the stored column values, so changing a label is a
//! schema migration. Transition rules enforced by this tier:
//! `PENDING -> APPROVED` and `PENDING -> REJECTED` for executors (both
//! terminal here; re-registration is an external collaborator's concern),
//! and `RUNNING -> WAITING` for processes whose assigned executor is
//! removed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Executor State
// ============================================================================

/// Approval state of a registered executor.
///
/// # Invariants
/// - New executors start `Pending`.
/// - `Approved` and `Rejected` are terminal at this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorState {
    /// Registered but not yet approved or rejected.
    #[default]
    Pending,
    /// Approved to pull and execute work.
    Approved,
    /// Rejected; will not be assigned work.
    Rejected,
}

impl ExecutorState {
    /// Returns the stable stored label for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a stored label back into a state (returns `None` if unknown).
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Process State
// ============================================================================

/// Work state of a process tracked by the collaborator process store.
///
/// # Invariants
/// - `Success` and `Failed` are terminal; only `Success` rows are eligible
///   for the retention sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    /// Queued and waiting for an executor assignment.
    #[default]
    Waiting,
    /// Assigned to an executor and running.
    Running,
    /// Completed successfully.
    Success,
    /// Completed with a failure.
    Failed,
}

impl ProcessState {
    /// Returns the stable stored label for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Parses a stored label back into a state (returns `None` if unknown).
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "waiting" => Some(Self::Waiting),
            "running" => Some(Self::Running),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::ExecutorState;
    use super::ProcessState;

    #[test]
    fn executor_labels_round_trip() {
        for state in [ExecutorState::Pending, ExecutorState::Approved, ExecutorState::Rejected] {
            assert_eq!(ExecutorState::parse(state.as_str()), Some(state));
        }
        assert_eq!(ExecutorState::parse("unknown"), None);
    }

    #[test]
    fn process_labels_round_trip() {
        for state in [
            ProcessState::Waiting,
            ProcessState::Running,
            ProcessState::Success,
            ProcessState::Failed,
        ] {
            assert_eq!(ProcessState::parse(state.as_str()), Some(state));
        }
        assert_eq!(ProcessState::parse(""), None);
    }
}
