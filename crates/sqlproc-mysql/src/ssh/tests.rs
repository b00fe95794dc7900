use super::*;

fn target() -> TunnelTarget {
    TunnelTarget {
        host: "db.internal".to_string(),
        port: 3306,
    }
}

/// A loopback port with nothing listening on it
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[test]
fn test_tunnel_error_display() {
    let err = SshTunnelError::ConnectionFailed {
        host: "bastion.example.com".to_string(),
        port: 22,
        source: std::io::Error::new(ErrorKind::TimedOut, "connection timed out"),
    };
    assert!(err.to_string().contains("bastion.example.com:22"));

    let err = SshTunnelError::ChannelFailed {
        host: "db.internal".to_string(),
        port: 3306,
        reason: "administratively prohibited".to_string(),
    };
    assert!(err.to_string().contains("db.internal:3306"));

    let err = SshTunnelError::PrivateKeyNotFound {
        path: "/path/to/key".to_string(),
    };
    assert!(err.to_string().contains("/path/to/key"));

    let err = SshTunnelError::AgentNotAvailable("no agent".to_string());
    assert!(err.to_string().contains("agent"));
}

#[test]
fn test_would_block_matches_only_eagain() {
    let eagain = ssh2::Error::new(ssh2::ErrorCode::Session(LIBSSH2_ERROR_EAGAIN), "would block");
    assert!(would_block(&eagain));

    let denied = ssh2::Error::new(ssh2::ErrorCode::Session(-22), "channel open failure");
    assert!(!would_block(&denied));
}

#[test]
fn test_target_display() {
    assert_eq!(target().to_string(), "db.internal:3306");
}

#[test]
fn test_open_rejects_invalid_config() {
    let config = SshTunnelConfig::with_password("", "user", "password");
    let err = SshTunnel::open(&config, target()).unwrap_err();
    assert!(format!("{err:#}").contains("Invalid SSH configuration"));
}

#[test]
fn test_open_reports_unreachable_bastion() {
    let config = SshTunnelConfig::with_password("127.0.0.1", "user", "password")
        .port(closed_port())
        .timeout(2);

    let err = SshTunnel::open(&config, target()).unwrap_err();
    match err.downcast_ref::<SshTunnelError>() {
        Some(SshTunnelError::ConnectionFailed { host, .. }) => assert_eq!(host, "127.0.0.1"),
        other => panic!("expected ConnectionFailed, got {other:?}"),
    }
}

#[test]
fn test_open_fails_handshake_against_non_ssh_server() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let _ = stream.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n");
        }
    });

    let config = SshTunnelConfig::with_password("127.0.0.1", "user", "password")
        .port(port)
        .timeout(2);
    let err = SshTunnel::open(&config, target()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SshTunnelError>(),
        Some(SshTunnelError::HandshakeFailed(_))
    ));

    server.join().unwrap();
}
