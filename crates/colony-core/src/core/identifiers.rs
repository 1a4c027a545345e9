// crates/colony-core/src/core/identifiers.rs
// ============================================================================
// Module: Colony Identifiers
// Description: Canonical opaque identifiers for Colony Store entities.
// Purpose: Provide strongly typed, serializable identifiers with stable wire
//          forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the canonical identifiers used throughout the Colony
//! Store tier. Identifiers are opaque UTF-8 strings minted by the API layer
//! upstream of this tier; no normalization or validation is applied here.
//! Uniqueness rules (global for colonies, colony-scoped for executors and
//! crons) are enforced by the store backends, not by these types.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Declares an opaque string identifier newtype with the canonical surface.
macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

string_identifier! {
    /// Colony identifier, globally unique alongside the colony name.
    ColonyId
}

string_identifier! {
    /// Executor identifier, globally unique; the executor *name* is unique
    /// only within its colony.
    ExecutorId
}

string_identifier! {
    /// Function identifier; one function row exists per (executor, function
    /// name) pair.
    FunctionId
}

string_identifier! {
    /// Cron identifier; the cron *name* is unique within its colony, so two
    /// colonies may each own a cron with the same name.
    CronId
}

string_identifier! {
    /// File identifier; each revision of a versioned file key carries its
    /// own file identifier.
    FileId
}

string_identifier! {
    /// Snapshot identifier for an immutable point-in-time file grouping.
    SnapshotId
}

string_identifier! {
    /// Process identifier for a unit of work tracked by the collaborator
    /// process store.
    ProcessId
}

string_identifier! {
    /// Workflow process-graph identifier. The empty string is a valid value
    /// meaning "no previous graph".
    GraphId
}

string_identifier! {
    /// Attribute identifier for a key/value attribute attached to a process.
    AttributeId
}

// ============================================================================
// SECTION: Tests
// ============================================================================
