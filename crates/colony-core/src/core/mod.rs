// crates/colony-core/src/core/mod.rs
// ============================================================================
// Module: Colony Core Types
// Description: Entity structs, identifiers, and state machines.
// Purpose: Group the domain vocabulary shared by all store backends.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The `core` module groups the persistence-tier domain vocabulary: opaque
//! identifiers, colony-owned entity structs, and the executor/process state
//! machines. All types serialize with stable wire forms.

pub mod entities;
pub mod identifiers;
pub mod state;
