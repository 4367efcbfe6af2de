//! SSH interactive-CLI transport.
//!
//! Opens one SSH session per push, requests a PTY shell, writes the framed
//! line sequence followed by `exit`, and collects everything the device
//! prints until it closes the channel. Built on russh, so no C libraries
//! are involved.

use async_trait::async_trait;
use russh::client::{Handle, Handler};
use russh::keys::key::PublicKey;
use russh::keys::load_secret_key;
use russh::{ChannelMsg, Disconnect};
use russh_keys::agent::client::AgentClient;
use std::sync::Arc;
use tracing::{debug, info, instrument, trace, warn};

use super::{
    platform_for, RejectionDetector, Transport, TransportError, TransportResult,
    TransportSettings,
};
use crate::error::{Error, Result};
use crate::inventory::Host;

/// Wraps `russh::Error` for the client handler.
#[derive(Debug)]
pub struct SshError(pub russh::Error);

impl From<russh::Error> for SshError {
    fn from(err: russh::Error) -> Self {
        SshError(err)
    }
}

impl std::fmt::Display for SshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SshError {}

/// Client handler that checks server keys against `~/.ssh/known_hosts`.
struct ClientHandler {
    host: String,
    port: u16,
    accept_unknown: bool,
}

#[async_trait]
impl Handler for ClientHandler {
    type Error = SshError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match russh::keys::check_known_hosts(&self.host, self.port, server_public_key) {
            Ok(true) => {
                debug!(host = %self.host, "Host key verified against known_hosts");
                Ok(true)
            }
            Ok(false) if self.accept_unknown => {
                warn!(host = %self.host, "Host not found in known_hosts, accepting");
                Ok(true)
            }
            Ok(false) => {
                warn!(host = %self.host, "Host not found in known_hosts, rejecting");
                Ok(false)
            }
            Err(e) => {
                warn!(host = %self.host, error = %e, "Host key verification failed");
                Ok(false)
            }
        }
    }
}

/// Pushes configuration over an SSH shell session.
#[derive(Debug, Clone)]
pub struct SshTransport {
    settings: TransportSettings,
    detector: RejectionDetector,
}

impl SshTransport {
    /// Create a transport, compiling the configured rejection patterns.
    pub fn new(settings: TransportSettings) -> Result<Self> {
        let detector = RejectionDetector::new(&settings.error_patterns)
            .map_err(|e| Error::config(format!("invalid transport error pattern: {}", e)))?;
        Ok(Self { settings, detector })
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    async fn connect(&self, host: &Host) -> TransportResult<Handle<ClientHandler>> {
        let timeout = self.settings.connect_timeout;
        let timed_out = || TransportError::Timeout {
            host: host.name.clone(),
            limit: timeout,
        };
        let failed = |message: String| TransportError::ConnectionFailed {
            host: host.name.clone(),
            message,
        };

        let mut config = russh::client::Config::default();
        config.inactivity_timeout = Some(self.settings.command_timeout);
        let config = Arc::new(config);

        let addr = format!("{}:{}", host.address(), host.port());
        debug!(addr = %addr, "Connecting");

        let socket = tokio::time::timeout(timeout, tokio::net::TcpStream::connect(&addr))
            .await
            .map_err(|_| timed_out())?
            .map_err(|e| failed(format!("{}: {}", addr, e)))?;

        socket
            .set_nodelay(true)
            .map_err(|e| failed(format!("failed to set TCP_NODELAY: {}", e)))?;

        let handler = ClientHandler {
            host: host.address().to_string(),
            port: host.port(),
            accept_unknown: self.settings.accept_unknown_host_keys,
        };

        tokio::time::timeout(
            timeout,
            russh::client::connect_stream(config, socket, handler),
        )
        .await
        .map_err(|_| timed_out())?
        .map_err(|e| failed(format!("SSH handshake failed: {}", e)))
    }

    async fn authenticate(
        &self,
        session: &mut Handle<ClientHandler>,
        host: &Host,
        user: &str,
    ) -> TransportResult<()> {
        let rejected = |message: String| TransportError::AuthenticationFailed {
            host: host.name.clone(),
            user: user.to_string(),
            message,
        };

        if let Some(key_file) = &host.connection.private_key_file {
            let path = shellexpand::tilde(key_file).into_owned();
            let key = load_secret_key(&path, None)
                .map_err(|e| rejected(format!("cannot load key '{}': {}", path, e)))?;
            let accepted = session
                .authenticate_publickey(user, Arc::new(key))
                .await
                .map_err(|e| rejected(e.to_string()))?;
            if accepted {
                debug!(key = %path, "Authenticated using key");
                return Ok(());
            }
            if host.connection.password.is_none() {
                return Err(rejected(format!("public key '{}' rejected", path)));
            }
        }

        if let Some(password) = &host.connection.password {
            let accepted = session
                .authenticate_password(user, password.as_str())
                .await
                .map_err(|e| rejected(e.to_string()))?;
            if accepted {
                debug!("Authenticated using password");
                return Ok(());
            }
            return Err(rejected("password rejected".to_string()));
        }

        self.authenticate_with_agent(session, user)
            .await
            .map_err(rejected)
    }

    async fn authenticate_with_agent(
        &self,
        session: &mut Handle<ClientHandler>,
        user: &str,
    ) -> std::result::Result<(), String> {
        let mut agent = AgentClient::connect_env()
            .await
            .map_err(|e| format!("no password or key set and SSH agent unavailable: {}", e))?;

        let identities = agent
            .request_identities()
            .await
            .map_err(|e| format!("failed to list SSH agent identities: {}", e))?;

        for identity in identities {
            let (returned, result) = session.authenticate_future(user, identity, agent).await;
            agent = returned;
            match result {
                Ok(true) => {
                    debug!("Authenticated using SSH agent");
                    return Ok(());
                }
                Ok(false) => trace!("Agent identity rejected, trying next"),
                Err(e) => trace!(error = %e, "Agent authentication attempt failed"),
            }
        }

        Err("all SSH agent identities rejected".to_string())
    }

    /// Write `lines` into an interactive shell and read until the device
    /// closes the channel.
    async fn run_shell(
        &self,
        handle: &Handle<ClientHandler>,
        host: &Host,
        lines: &[String],
    ) -> TransportResult<String> {
        let channel_err = |e: russh::Error| TransportError::Channel {
            host: host.name.clone(),
            message: e.to_string(),
        };

        let mut channel = handle.channel_open_session().await.map_err(channel_err)?;
        channel
            .request_pty(false, "vt100", 511, 24, 0, 0, &[])
            .await
            .map_err(channel_err)?;
        channel.request_shell(true).await.map_err(channel_err)?;

        let exchange = async {
            for line in lines {
                trace!(line = %line, "Sending");
                let data = format!("{}\n", line);
                channel.data(data.as_bytes()).await.map_err(channel_err)?;
            }
            channel.data(&b"exit\n"[..]).await.map_err(channel_err)?;

            let mut output = Vec::new();
            while let Some(msg) = channel.wait().await {
                match msg {
                    ChannelMsg::Data { ref data } => output.extend_from_slice(data),
                    ChannelMsg::ExtendedData { ref data, .. } => output.extend_from_slice(data),
                    ChannelMsg::Eof | ChannelMsg::Close => break,
                    _ => {}
                }
            }
            Ok::<_, TransportError>(String::from_utf8_lossy(&output).into_owned())
        };

        tokio::time::timeout(self.settings.command_timeout, exchange)
            .await
            .map_err(|_| TransportError::Timeout {
                host: host.name.clone(),
                limit: self.settings.command_timeout,
            })?
    }
}

#[async_trait]
impl Transport for SshTransport {
    #[instrument(skip_all, fields(host = %host.name, commands = commands.len()))]
    async fn push_config(&self, host: &Host, commands: &[String]) -> TransportResult<String> {
        let platform = platform_for(host)?;
        let user = host
            .username()
            .ok_or_else(|| TransportError::MissingCredentials(host.name.clone()))?;
        let lines = platform.frame(commands, self.settings.save_config);

        let mut handle = self.connect(host).await?;
        self.authenticate(&mut handle, host, user).await?;

        let result = self.run_shell(&handle, host, &lines).await;
        if let Err(e) = handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
        {
            debug!(error = %e, "Disconnect failed");
        }
        let output = result?;

        if let Some(rejection) = self.detector.scan(&output, &lines) {
            warn!(command = %rejection.command, "Device rejected a command");
            return Err(TransportError::CommandRejected {
                host: host.name.clone(),
                command: rejection.command,
                output: rejection.line,
            });
        }

        info!(%platform, lines = lines.len(), "Configuration pushed");
        Ok(output)
    }
}
