//! Unit tests for siteforge CLI
//!
//! These tests use scripted fakes and run fast without network I/O.

mod install_site;
mod probe_host;
