//! Local port forwarding over an SSH session.

use crate::error::{SshError, SshResult};
use crate::keys::load_private_key;
use async_trait::async_trait;
use russh::client::{self, Handle};
use russh_keys::key::PublicKey;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// SSH server and credentials for one tunnel.
#[derive(Clone, Default)]
pub struct SshTunnelRecord {
    /// SSH server host.
    pub server_address: String,
    /// SSH server port.
    pub server_port: u16,
    /// Login user.
    pub username: String,
    /// Password, when authenticating by password.
    pub password: Option<String>,
    /// PEM/OpenSSH private key, when authenticating by key.
    pub private_key: Option<String>,
    /// Passphrase for `private_key`.
    pub private_key_password: Option<String>,
}

impl fmt::Debug for SshTunnelRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshTunnelRecord")
            .field("server_address", &self.server_address)
            .field("server_port", &self.server_port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("private_key", &self.private_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Timeouts applied to every tunnel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TunnelTimeouts {
    /// TCP connect and session handshake.
    pub connect: Duration,
    /// Each request/response exchange after the handshake.
    pub packet: Duration,
}

impl Default for TunnelTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            packet: Duration::from_secs(1),
        }
    }
}

impl TunnelTimeouts {
    /// Builds timeouts from fractional seconds.
    pub fn from_secs_f64(connect: f64, packet: f64) -> SshResult<Self> {
        let to_duration = |name: &str, secs: f64| {
            Duration::try_from_secs_f64(secs)
                .ok()
                .filter(|d| !d.is_zero())
                .ok_or_else(|| SshError::Configuration(format!("{} must be positive, got {}", name, secs)))
        };
        Ok(Self {
            connect: to_duration("timeout_sec", connect)?,
            packet: to_duration("packet_timeout_sec", packet)?,
        })
    }
}

struct TunnelClient;

#[async_trait]
impl client::Handler for TunnelClient {
    type Error = russh::Error;

    async fn check_server_key(&mut self, _server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// An open tunnel forwarding a local port to a remote host through SSH.
///
/// Forwarding stops when [`SshTunnel::stop`] is called or the tunnel is
/// dropped.
pub struct SshTunnel {
    local_bind_address: String,
    local_bind_port: u16,
    remote_host: String,
    remote_port: u16,
    forwarder: JoinHandle<()>,
    session: Arc<Handle<TunnelClient>>,
}

impl SshTunnel {
    /// Connects, authenticates and starts forwarding.
    pub async fn open(
        record: &SshTunnelRecord,
        remote_host: &str,
        remote_port: u16,
        local_bind_address: &str,
        timeouts: TunnelTimeouts,
    ) -> SshResult<Self> {
        let server = format!("{}:{}", record.server_address, record.server_port);
        info!(server = %server, remote = %format!("{}:{}", remote_host, remote_port), "Opening SSH tunnel");

        let config = Arc::new(client::Config::default());
        let mut session = tokio::time::timeout(
            timeouts.connect,
            client::connect(config, server.as_str(), TunnelClient),
        )
        .await
        .map_err(|_| SshError::TunnelUnavailable(format!("Timed out connecting to {}", server)))?
        .map_err(|e| SshError::TunnelUnavailable(format!("{}: {}", server, e)))?;

        authenticate(&mut session, record, timeouts.packet).await?;

        let listener = TcpListener::bind((local_bind_address, 0))
            .await
            .map_err(|e| SshError::TunnelUnavailable(format!("Cannot bind local port: {}", e)))?;
        let local_bind_port = listener
            .local_addr()
            .map_err(|e| SshError::TunnelUnavailable(e.to_string()))?
            .port();

        let session = Arc::new(session);
        let forwarder = tokio::spawn(forward(
            listener,
            Arc::clone(&session),
            remote_host.to_string(),
            remote_port,
            timeouts.packet,
        ));

        info!(
            local = %format!("{}:{}", local_bind_address, local_bind_port),
            "SSH tunnel open"
        );

        Ok(Self {
            local_bind_address: local_bind_address.to_string(),
            local_bind_port,
            remote_host: remote_host.to_string(),
            remote_port,
            forwarder,
            session,
        })
    }

    /// Local address the forwarded port is bound to.
    #[must_use]
    pub fn local_bind_address(&self) -> &str {
        &self.local_bind_address
    }

    /// Local port forwarding to the remote end.
    #[must_use]
    pub fn local_bind_port(&self) -> u16 {
        self.local_bind_port
    }

    /// Stops forwarding and closes the SSH session.
    pub async fn stop(self) {
        self.forwarder.abort();
        if let Err(e) = self
            .session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
        {
            debug!(error = %e, "SSH disconnect failed");
        }
        info!(local_port = self.local_bind_port, "SSH tunnel stopped");
    }
}

impl Drop for SshTunnel {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

impl fmt::Debug for SshTunnel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshTunnel")
            .field("local_bind_address", &self.local_bind_address)
            .field("local_bind_port", &self.local_bind_port)
            .field("remote_host", &self.remote_host)
            .field("remote_port", &self.remote_port)
            .finish_non_exhaustive()
    }
}

async fn authenticate(
    session: &mut Handle<TunnelClient>,
    record: &SshTunnelRecord,
    packet_timeout: Duration,
) -> SshResult<()> {
    let user = record.username.as_str();
    let authenticated = if let Some(pem) = &record.private_key {
        let key = load_private_key(pem, record.private_key_password.as_deref())?;
        debug!(user = %user, key_type = %key.key_type, "Authenticating with private key");
        tokio::time::timeout(
            packet_timeout,
            session.authenticate_publickey(user, Arc::new(key.key_pair)),
        )
        .await
    } else if let Some(password) = &record.password {
        debug!(user = %user, "Authenticating with password");
        tokio::time::timeout(packet_timeout, session.authenticate_password(user, password)).await
    } else {
        return Err(SshError::AuthFailed(user.to_string()));
    };

    match authenticated {
        Ok(Ok(true)) => Ok(()),
        Ok(Ok(false)) => Err(SshError::AuthFailed(user.to_string())),
        Ok(Err(e)) => Err(SshError::TunnelUnavailable(format!("Authentication error: {}", e))),
        Err(_) => Err(SshError::TunnelUnavailable(
            "Timed out waiting for authentication".to_string(),
        )),
    }
}

async fn forward(
    listener: TcpListener,
    session: Arc<Handle<TunnelClient>>,
    remote_host: String,
    remote_port: u16,
    packet_timeout: Duration,
) {
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "Tunnel listener failed");
                return;
            }
        };
        debug!(peer = %peer, "Accepted tunnel connection");

        let session = Arc::clone(&session);
        let remote_host = remote_host.clone();
        tokio::spawn(async move {
            if let Err(e) = relay(socket, &session, &remote_host, remote_port, peer, packet_timeout).await {
                warn!(peer = %peer, error = %e, "Tunnel connection closed with error");
            }
        });
    }
}

async fn relay(
    mut socket: TcpStream,
    session: &Handle<TunnelClient>,
    remote_host: &str,
    remote_port: u16,
    peer: std::net::SocketAddr,
    packet_timeout: Duration,
) -> SshResult<()> {
    let channel = tokio::time::timeout(
        packet_timeout,
        session.channel_open_direct_tcpip(
            remote_host,
            u32::from(remote_port),
            peer.ip().to_string(),
            u32::from(peer.port()),
        ),
    )
    .await
    .map_err(|_| SshError::TunnelUnavailable("Timed out opening forwarding channel".to_string()))?
    .map_err(|e| SshError::TunnelUnavailable(format!("Cannot open forwarding channel: {}", e)))?;

    let mut stream = channel.into_stream();
    let (sent, received) = tokio::io::copy_bidirectional(&mut socket, &mut stream)
        .await
        .map_err(|e| SshError::TunnelUnavailable(e.to_string()))?;
    debug!(peer = %peer, sent, received, "Tunnel connection finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_from_fractional_seconds() {
        let timeouts = TunnelTimeouts::from_secs_f64(10.0, 0.5).unwrap();
        assert_eq!(timeouts.connect, Duration::from_secs(10));
        assert_eq!(timeouts.packet, Duration::from_millis(500));
    }

    #[test]
    fn test_non_positive_timeouts_rejected() {
        assert!(TunnelTimeouts::from_secs_f64(0.0, 1.0).is_err());
        assert!(TunnelTimeouts::from_secs_f64(1.0, -2.0).is_err());
        assert!(TunnelTimeouts::from_secs_f64(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_record_debug_hides_secrets() {
        let record = SshTunnelRecord {
            server_address: "bastion".to_string(),
            server_port: 22,
            username: "bob".to_string(),
            password: Some("hunter2".to_string()),
            ..SshTunnelRecord::default()
        };
        let debug = format!("{:?}", record);
        assert!(debug.contains("bastion"));
        assert!(!debug.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let record = SshTunnelRecord {
            server_address: "127.0.0.1".to_string(),
            server_port: 1,
            username: "bob".to_string(),
            password: Some("x".to_string()),
            ..SshTunnelRecord::default()
        };
        let err = SshTunnel::open(&record, "db", 5432, "127.0.0.1", TunnelTimeouts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SshError::TunnelUnavailable(_)));
    }
}
