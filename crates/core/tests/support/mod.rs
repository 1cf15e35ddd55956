//! Shared test helpers for `taxbridge-core` integration tests.
//!
//! In-memory ports and item builders so scenario tests can focus on
//! behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod fixtures;
pub mod ports;
