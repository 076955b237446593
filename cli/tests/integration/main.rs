//! Integration tests for siteforge CLI
//!
//! These tests spawn the actual binary and test end-to-end behavior
//! without contacting any server.

mod cli_tests;
mod config_command;
mod install_command;
