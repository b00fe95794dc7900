//! SSH tunnel to a MySQL server behind a bastion host
//!
//! The tunnel listens on an ephemeral loopback port and forwards every
//! accepted connection through a `direct-tcpip` channel to the database host
//! as seen from the bastion. All of it is blocking `ssh2` code; async callers
//! open tunnels on the blocking thread pool.

use anyhow::{Context, Result};
use sqlproc_core::{SshAuthMethod, SshTunnelConfig};
use ssh2::Session;
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const BUFFER_SIZE: usize = 8192;
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, thiserror::Error)]
pub enum SshTunnelError {
    #[error("Failed to connect to SSH server {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    #[error("SSH handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("SSH authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Failed to open forwarding channel to {host}:{port}: {reason}")]
    ChannelFailed {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("SSH agent not available: {0}")]
    AgentNotAvailable(String),

    #[error("Private key file not found: {path}")]
    PrivateKeyNotFound { path: String },

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),
}

/// Where forwarded connections end up, as seen from the bastion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelTarget {
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for TunnelTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// An open SSH tunnel. Dropping it stops forwarding and disconnects.
pub struct SshTunnel {
    session: Session,
    local_addr: SocketAddr,
    target: TunnelTarget,
    running: Arc<AtomicBool>,
    acceptor: Option<thread::JoinHandle<()>>,
}

impl std::fmt::Debug for SshTunnel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshTunnel")
            .field("local_addr", &self.local_addr)
            .field("target", &self.target)
            .field("running", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl SshTunnel {
    /// Connect and authenticate to the bastion, then start forwarding a
    /// loopback port to `target`.
    pub fn open(config: &SshTunnelConfig, target: TunnelTarget) -> Result<Self> {
        config.validate().context("Invalid SSH configuration")?;

        info!(
            ssh_host = %config.host,
            ssh_port = config.port,
            target = %target,
            "Opening SSH tunnel"
        );

        let timeout = Duration::from_secs(config.timeout_seconds.max(1) as u64);
        let tcp = connect_bastion(&config.host, config.port, timeout)?;
        tcp.set_read_timeout(Some(timeout))?;
        tcp.set_write_timeout(Some(timeout))?;

        let mut session = Session::new().context("Failed to create SSH session")?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| SshTunnelError::HandshakeFailed(e.to_string()))?;

        authenticate(&session, &config.username, &config.auth)?;

        if config.keepalive_seconds > 0 {
            session.set_keepalive(true, config.keepalive_seconds);
        }

        // bound before the acceptor starts so the port cannot be taken in between
        let listener = TcpListener::bind("127.0.0.1:0").context("Failed to bind tunnel port")?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let running = Arc::new(AtomicBool::new(true));
        let acceptor = spawn_acceptor(listener, session.clone(), target.clone(), running.clone());

        info!(local_port = local_addr.port(), target = %target, "SSH tunnel established");

        Ok(Self {
            session,
            local_addr,
            target,
            running,
            acceptor: Some(acceptor),
        })
    }

    /// Loopback port the database client should connect to
    pub fn local_port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn target(&self) -> &TunnelTarget {
        &self.target
    }

    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for SshTunnel {
    fn drop(&mut self) {
        debug!(local_port = self.local_addr.port(), "Closing SSH tunnel");
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.acceptor.take() {
            let _ = handle.join();
        }
        if let Err(e) = self.session.disconnect(None, "Tunnel closed", None) {
            warn!("Error disconnecting SSH session: {}", e);
        }
    }
}

/// Try every resolved address of the bastion until one accepts.
fn connect_bastion(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| SshTunnelError::ConnectionFailed {
            host: host.to_string(),
            port,
            source,
        })?;

    let mut last_error = std::io::Error::new(ErrorKind::NotFound, "host resolved to no addresses");
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!(%addr, error = %e, "SSH connect attempt failed");
                last_error = e;
            }
        }
    }

    Err(SshTunnelError::ConnectionFailed {
        host: host.to_string(),
        port,
        source: last_error,
    }
    .into())
}

fn authenticate(session: &Session, username: &str, auth: &SshAuthMethod) -> Result<()> {
    match auth {
        SshAuthMethod::Password { password } => {
            debug!("Authenticating with password");
            session
                .userauth_password(username, password)
                .map_err(|e| SshTunnelError::AuthenticationFailed(e.to_string()))?;
        }
        SshAuthMethod::PrivateKey { path, passphrase } => {
            debug!(path = %path.display(), "Authenticating with private key");
            if !path.exists() {
                return Err(SshTunnelError::PrivateKeyNotFound {
                    path: path.display().to_string(),
                }
                .into());
            }
            session
                .userauth_pubkey_file(username, None, path, passphrase.as_deref())
                .map_err(|e| SshTunnelError::InvalidPrivateKey(e.to_string()))?;
        }
        SshAuthMethod::Agent => {
            debug!("Authenticating with SSH agent");
            authenticate_with_agent(session, username)?;
        }
    }

    if !session.authenticated() {
        return Err(
            SshTunnelError::AuthenticationFailed("server did not accept credentials".into()).into(),
        );
    }
    Ok(())
}

fn authenticate_with_agent(session: &Session, username: &str) -> Result<()> {
    let unavailable = |e: ssh2::Error| SshTunnelError::AgentNotAvailable(e.to_string());

    let mut agent = session.agent().map_err(unavailable)?;
    agent.connect().map_err(unavailable)?;
    agent.list_identities().map_err(unavailable)?;

    let identities = agent.identities().map_err(unavailable)?;
    if identities.is_empty() {
        return Err(SshTunnelError::AgentNotAvailable("no identities in agent".into()).into());
    }

    for identity in &identities {
        if agent.userauth(username, identity).is_ok() && session.authenticated() {
            debug!(comment = identity.comment(), "Authenticated with agent identity");
            return Ok(());
        }
    }

    Err(SshTunnelError::AuthenticationFailed("no agent identity was accepted".into()).into())
}

fn spawn_acceptor(
    listener: TcpListener,
    session: Session,
    target: TunnelTarget,
    running: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while running.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    debug!(%peer, "Forwarding tunnel connection");
                    let session = session.clone();
                    let target = target.clone();
                    let running = running.clone();
                    thread::spawn(move || {
                        if let Err(e) = forward(stream, &session, &target, &running) {
                            debug!("Tunnel connection ended with error: {:#}", e);
                        }
                    });
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    warn!("Tunnel listener failed: {}", e);
                    running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }
        debug!("Tunnel acceptor exiting");
    })
}

/// libssh2's EAGAIN, returned by a session left non-blocking
const LIBSSH2_ERROR_EAGAIN: i32 = -37;

fn would_block(e: &ssh2::Error) -> bool {
    e.code() == ssh2::ErrorCode::Session(LIBSSH2_ERROR_EAGAIN)
}

/// Open a `direct-tcpip` channel to the target.
///
/// The session is shared by every forwarding thread and each of them flips
/// it to non-blocking while pumping, so the open can see EAGAIN and is
/// retried until it completes or the tunnel stops.
fn open_channel(
    session: &Session,
    target: &TunnelTarget,
    running: &AtomicBool,
) -> Result<ssh2::Channel> {
    loop {
        match session.channel_direct_tcpip(&target.host, target.port, None) {
            Ok(channel) => return Ok(channel),
            Err(ref e) if would_block(e) && running.load(Ordering::SeqCst) => {
                thread::sleep(IDLE_POLL_INTERVAL);
            }
            Err(e) => {
                return Err(SshTunnelError::ChannelFailed {
                    host: target.host.clone(),
                    port: target.port,
                    reason: e.to_string(),
                }
                .into());
            }
        }
    }
}

/// Pump bytes both ways between one local client and one SSH channel.
fn forward(
    mut local: TcpStream,
    session: &Session,
    target: &TunnelTarget,
    running: &AtomicBool,
) -> Result<()> {
    local.set_nonblocking(false)?;
    local.set_read_timeout(Some(Duration::from_millis(100)))?;

    let mut channel = open_channel(session, target, running)?;

    session.set_blocking(false);

    let mut upstream = [0u8; BUFFER_SIZE];
    let mut downstream = [0u8; BUFFER_SIZE];

    while running.load(Ordering::SeqCst) {
        let mut moved = false;

        match local.read(&mut upstream) {
            Ok(0) => break,
            Ok(n) => {
                session.set_blocking(true);
                let written = channel.write_all(&upstream[..n]);
                session.set_blocking(false);
                written?;
                moved = true;
            }
            Err(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(e) => return Err(e.into()),
        }

        match channel.read(&mut downstream) {
            Ok(0) => {
                if channel.eof() {
                    break;
                }
            }
            Ok(n) => {
                local.write_all(&downstream[..n])?;
                moved = true;
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => {}
            Err(e) => return Err(e.into()),
        }

        if !moved {
            thread::sleep(IDLE_POLL_INTERVAL);
        }
    }

    session.set_blocking(true);
    let _ = channel.send_eof();
    let _ = channel.wait_close();
    Ok(())
}

#[cfg(test)]
mod tests;
