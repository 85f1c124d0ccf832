//! End-to-end tests for the Ember claim-scenario harness.
//!
//! This crate wires the schedule builder and the scenario orchestrator
//! through the in-memory chain double and checks the full flow with
//! production-shaped token amounts.

#![forbid(unsafe_code)]
#![deny(warnings)]
