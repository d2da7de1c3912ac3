//! Integration tests for sweep

mod cli_commands;
mod config_integration;
mod deletion_backend;
mod http_transport;
mod run_lease;
mod test_utils;
