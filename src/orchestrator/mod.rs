//! Application-level orchestration.
//!
//! This module owns the analysis request lifecycle and the workflow shell that
//! ties validation, presentation, notices and export together. UI/CLI layers
//! call into this module to keep responsibilities separated.

pub(crate) mod controller;
mod session;
mod workflow;

#[cfg(feature = "tui")]
pub(crate) use session::run_session;
pub(crate) use workflow::Workflow;
