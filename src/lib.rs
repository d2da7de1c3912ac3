//! Sweep: batched, verified bulk deletion of catalog products and orders.
//!
//! A cleanup service answers count and batch-delete requests against a
//! record store. The batch orchestrator drives a full deletion run against
//! that service, in-process or over HTTP, and verifies the result with a
//! fresh count once the backend reports the collection exhausted.

pub mod audit;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod counts;
pub mod deletion;
pub mod error;
pub mod lease;
pub mod logging;
pub mod orchestrator;
pub mod protocol;
pub mod server;
pub mod service;
pub mod store;
pub mod types;
