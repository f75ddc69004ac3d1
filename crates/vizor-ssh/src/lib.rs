//! # Vizor SSH
//!
//! Local port forwarding so database connections can reach hosts behind an
//! SSH bastion. A tunnel binds a local port, forwards every accepted
//! connection over a `direct-tcpip` channel, and the database URL is
//! rewritten to point at the local end.

pub mod error;
pub mod keys;
pub mod manager;
pub mod tunnel;
pub mod url;

pub use error::{SshError, SshResult};
pub use keys::{load_private_key, KeyType, LoadedKey};
pub use manager::{
    ssh_manager, SshManager, SshManagerFactory, SshManagerInterface, DEFAULT_SSH_MANAGER_CLASS,
};
pub use tunnel::{SshTunnel, SshTunnelRecord, TunnelTimeouts};
pub use crate::url::{default_port, remote_target, rewrite_database_url};
