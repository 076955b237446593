//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod secrets;
pub mod shell;
pub mod site;
pub mod templates;

pub use config::{SiteforgeConfig, validate_config};
pub use error::{ConfigError, ConnectionError, ExecError, ProvisionError, SiteError};
pub use site::{ConnectionSpec, Credential, SiteParameters, validate_site};
