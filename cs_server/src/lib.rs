//! HTTP API server for campus resource sharing and category chat.
//!
//! The binary in `main.rs` wires configuration, logging and storage together;
//! everything it serves is built from the modules exported here so the router
//! can be driven in-process by integration tests.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
