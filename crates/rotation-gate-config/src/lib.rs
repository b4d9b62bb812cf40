// crates/rotation-gate-config/src/lib.rs
// ============================================================================
// Module: Rotation Gate Config Library
// Description: Canonical config model and bounded validation.
// Purpose: Single source of truth for rotation-gate.toml semantics.
// Dependencies: rotation-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! `rotation-gate-config` defines the configuration model for Rotation Gate.
//! Validation is strict and fail-closed: every limit is explicit, unknown
//! keys are rejected, and validated sections convert into the core runtime
//! configuration structs.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
