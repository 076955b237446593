//! Command implementations

pub mod config;
pub mod install;
pub mod probe;
pub mod version;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::domain::error::SiteError;
use crate::domain::site::{ConnectionSpec, Credential, validate_host};

/// How to reach and log in to the target host.
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Host name or IP address of the server
    #[arg(long)]
    pub host: String,

    /// SSH port
    #[arg(long, default_value_t = 22)]
    pub port: u16,

    /// SSH login user (needs sudo)
    #[arg(long, short = 'u', default_value = "root")]
    pub user: String,

    /// SSH password
    #[arg(long, env = "SITEFORGE_SSH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Private key file; takes precedence over a password
    #[arg(long, short = 'i')]
    pub identity: Option<PathBuf>,

    /// Passphrase for the private key
    #[arg(long, env = "SITEFORGE_SSH_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,
}

impl ConnectionArgs {
    /// Validate the arguments and load the credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is malformed, no credential was given,
    /// or the key file cannot be read.
    pub fn to_spec(&self) -> Result<ConnectionSpec> {
        validate_host(&self.host)?;
        let credential = match (&self.identity, &self.password) {
            (Some(path), _) => Credential::PrivateKey {
                pem: std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read key file {}", path.display()))?,
                passphrase: self.passphrase.clone(),
            },
            (None, Some(password)) => Credential::Password(password.clone()),
            (None, None) => return Err(SiteError::MissingCredential.into()),
        };
        Ok(ConnectionSpec {
            host: self.host.trim().to_string(),
            port: self.port,
            username: self.user.clone(),
            credential,
        })
    }
}
