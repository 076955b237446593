//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: SSH sessions, host key
//! pinning, name resolution, and config file access.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod config;
pub mod known_hosts;
pub mod network;
pub mod ssh;
