//! Infrastructure implementation of the `SessionConnector` and `RemoteShell`
//! ports over russh.
//!
//! Each command runs on its own channel of one authenticated connection, so
//! read-only checks can run concurrently.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use russh::client::{self, Handle};
use russh::keys::{HashAlg, PrivateKeyWithHashAlg, PublicKey, decode_secret_key};
use russh::{ChannelMsg, Disconnect};

use crate::application::ports::{CommandOutcome, RemoteShell, SessionConnector};
use crate::domain::config::ConnectionConfig;
use crate::domain::error::{ConnectionError, ExecError};
use crate::domain::site::{ConnectionSpec, Credential};
use crate::infra::known_hosts::{HostKeyStatus, KnownHostsManager};

/// SSH stream id of stderr in `SSH_MSG_CHANNEL_EXTENDED_DATA`.
const STDERR_STREAM: u32 = 1;

/// Keepalives missed before the connection is considered dead.
const KEEPALIVE_MAX: usize = 3;

/// Verifies server keys against [`KnownHostsManager`].
pub struct TofuHandler {
    known_hosts: Arc<KnownHostsManager>,
    host_id: String,
}

impl client::Handler for TofuHandler {
    type Error = russh::Error;

    async fn check_server_key(&mut self, key: &PublicKey) -> Result<bool, Self::Error> {
        let fingerprint = key.fingerprint(HashAlg::Sha256).to_string();
        match self.known_hosts.verify(&self.host_id, &fingerprint) {
            Ok(HostKeyStatus::Trusted) => Ok(true),
            Ok(HostKeyStatus::Recorded) => {
                tracing::info!(host = %self.host_id, %fingerprint, "pinned new host key");
                Ok(true)
            }
            Ok(HostKeyStatus::Mismatch { expected }) => {
                tracing::warn!(
                    host = %self.host_id,
                    %expected,
                    presented = %fingerprint,
                    "host key does not match the pinned key"
                );
                Ok(false)
            }
            Err(err) => {
                tracing::warn!(host = %self.host_id, "cannot verify host key: {err:#}");
                Ok(false)
            }
        }
    }
}

/// Production `SessionConnector`: password or private key auth over russh.
pub struct RusshConnector {
    config: ConnectionConfig,
    known_hosts: Arc<KnownHostsManager>,
}

impl RusshConnector {
    #[must_use]
    pub fn new(config: ConnectionConfig, known_hosts: KnownHostsManager) -> Self {
        Self {
            config,
            known_hosts: Arc::new(known_hosts),
        }
    }

    fn map_connect_error(&self, err: russh::Error, spec: &ConnectionSpec) -> ConnectionError {
        match err {
            russh::Error::UnknownKey => ConnectionError::HostKeyRejected {
                host: spec.host.clone(),
                known_hosts: self.known_hosts.path().display().to_string(),
            },
            russh::Error::Disconnect | russh::Error::HUP => ConnectionError::ClosedBeforeReady {
                host: spec.host.clone(),
            },
            russh::Error::ConnectionTimeout => ConnectionError::Timeout {
                host: spec.host.clone(),
                port: spec.port,
                secs: self.config.connect_timeout().as_secs(),
            },
            other => ConnectionError::Network {
                host: spec.host.clone(),
                port: spec.port,
                reason: other.to_string(),
            },
        }
    }

    async fn connect(&self, spec: &ConnectionSpec) -> Result<RemoteSession, ConnectionError> {
        let config = Arc::new(client::Config {
            keepalive_interval: Some(self.config.keepalive()),
            keepalive_max: KEEPALIVE_MAX,
            ..Default::default()
        });
        let handler = TofuHandler {
            known_hosts: Arc::clone(&self.known_hosts),
            host_id: format!("{}:{}", spec.host, spec.port),
        };

        let mut handle = client::connect(config, (spec.host.as_str(), spec.port), handler)
            .await
            .map_err(|e| self.map_connect_error(e, spec))?;

        let auth = match &spec.credential {
            Credential::Password(password) => {
                handle
                    .authenticate_password(spec.username.as_str(), password.as_str())
                    .await
            }
            Credential::PrivateKey { pem, passphrase } => {
                let key = decode_secret_key(pem, passphrase.as_deref())
                    .map_err(|e| ConnectionError::InvalidKey(e.to_string()))?;
                let hash_alg = handle
                    .best_supported_rsa_hash()
                    .await
                    .map_err(|e| self.map_connect_error(e, spec))?
                    .flatten();
                handle
                    .authenticate_publickey(
                        spec.username.as_str(),
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await
            }
        }
        .map_err(|e| self.map_connect_error(e, spec))?;

        if !auth.success() {
            let _ = handle
                .disconnect(Disconnect::ByApplication, "", "English")
                .await;
            return Err(ConnectionError::Auth {
                user: spec.username.clone(),
                host: spec.host.clone(),
            });
        }

        tracing::info!(host = %spec.host, port = spec.port, user = %spec.username, "session ready");
        Ok(RemoteSession {
            handle,
            closed: AtomicBool::new(false),
        })
    }
}

impl SessionConnector for RusshConnector {
    type Session = RemoteSession;

    async fn open(&self, spec: &ConnectionSpec) -> Result<RemoteSession, ConnectionError> {
        let ceiling = self.config.connect_timeout();
        tracing::debug!(host = %spec.host, port = spec.port, "connecting");
        match tokio::time::timeout(ceiling, self.connect(spec)).await {
            Ok(result) => result,
            // Dropping the connect future drops any half-open transport.
            Err(_) => Err(ConnectionError::Timeout {
                host: spec.host.clone(),
                port: spec.port,
                secs: ceiling.as_secs(),
            }),
        }
    }
}

/// One authenticated SSH connection.
pub struct RemoteSession {
    handle: Handle<TofuHandler>,
    closed: AtomicBool,
}

impl RemoteSession {
    async fn run(&self, label: &str, script: &str) -> Result<CommandOutcome, ExecError> {
        let transport = |e: russh::Error| ExecError::Transport {
            context: label.to_string(),
            reason: e.to_string(),
        };
        let mut channel = self.handle.channel_open_session().await.map_err(transport)?;
        channel.exec(true, script).await.map_err(transport)?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_status = None;
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, ext } if ext == STDERR_STREAM => {
                    stderr.extend_from_slice(data);
                }
                ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
                _ => {}
            }
        }

        let code = exit_status.ok_or_else(|| ExecError::MissingExitStatus {
            context: label.to_string(),
        })?;
        Ok(CommandOutcome {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code: i32::try_from(code).unwrap_or(i32::MAX),
        })
    }
}

impl RemoteShell for RemoteSession {
    async fn exec(
        &self,
        label: &str,
        script: &str,
        timeout: Duration,
    ) -> Result<CommandOutcome, ExecError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ExecError::SessionUnavailable);
        }
        tracing::debug!(command = label, "exec");
        match tokio::time::timeout(timeout, self.run(label, script)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(command = label, timeout_secs = timeout.as_secs(), "command timed out");
                Err(ExecError::Timeout {
                    context: label.to_string(),
                    timeout,
                })
            }
        }
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(err) = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
        {
            tracing::debug!("disconnect: {err}");
        }
    }
}
