/// Integration tests for the sandbox database liveness probe
///
/// The refused and rejected cases run against loopback listeners and need no
/// database. The remaining cases need a live PostgreSQL and are skipped when
/// `SANDBOX_TEST_PG_HOST` is unset.

mod common;

use common::{test_database, unique_sandbox};
use sandboxdb_shared::db::connection::SandboxDbConfig;
use sandboxdb_shared::db::liveness::{check_database_instance, InstanceStatus};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const SSL_REQUEST_CODE: u32 = 80877103;
const GSSENC_REQUEST_CODE: u32 = 80877104;

fn probe_config(port: u16) -> SandboxDbConfig {
    SandboxDbConfig {
        port,
        user: "osm".to_string(),
        password: "osm".to_string(),
        database: "openstreetmap".to_string(),
    }
}

/// A port on loopback with nothing listening on it
fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Accepts one client, declines TLS, and fails its login like PostgreSQL does
async fn reject_login(listener: TcpListener) {
    let (mut stream, _) = listener.accept().await.unwrap();

    loop {
        let len = stream.read_u32().await.unwrap() as usize;
        let mut body = vec![0u8; len - 4];
        stream.read_exact(&mut body).await.unwrap();

        let code = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
        if code == SSL_REQUEST_CODE || code == GSSENC_REQUEST_CODE {
            stream.write_all(b"N").await.unwrap();
            continue;
        }
        break;
    }

    let mut fields = Vec::new();
    for (tag, value) in [
        (b'S', "FATAL"),
        (b'V', "FATAL"),
        (b'C', "28P01"),
        (b'M', "password authentication failed for user \"osm\""),
    ] {
        fields.push(tag);
        fields.extend_from_slice(value.as_bytes());
        fields.push(0);
    }
    fields.push(0);

    let mut message = vec![b'E'];
    message.extend_from_slice(&((fields.len() + 4) as u32).to_be_bytes());
    message.extend_from_slice(&fields);
    stream.write_all(&message).await.unwrap();
    stream.flush().await.unwrap();

    // Hold the socket open until the client hangs up
    let mut buf = [0u8; 64];
    let _ = stream.read(&mut buf).await;
}

#[tokio::test]
async fn test_no_listener_is_not_running() {
    let config = probe_config(closed_port());
    let status = check_database_instance(&config, "127.0.0.1").await;
    assert_eq!(status, InstanceStatus::NotRunning);
}

#[tokio::test]
async fn test_rejected_login_is_not_found() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(reject_login(listener));

    let status = check_database_instance(&probe_config(port), "127.0.0.1").await;
    assert_eq!(status, InstanceStatus::NotFound);

    server.await.unwrap();
}

#[tokio::test]
async fn test_unresolvable_host_is_not_found() {
    let config = probe_config(5432);
    let status = check_database_instance(&config, "no-such-sandbox-db.invalid").await;
    assert_eq!(status, InstanceStatus::NotFound);
}

#[tokio::test]
async fn test_live_database_is_running() {
    let Some((mut config, endpoint)) = test_database() else {
        eprintln!("SANDBOX_TEST_PG_HOST not set, skipping");
        return;
    };
    config.port = endpoint.port;

    let status = check_database_instance(&config, &endpoint.host).await;
    assert_eq!(status, InstanceStatus::Running);
}

#[tokio::test]
async fn test_missing_database_is_not_found() {
    let Some((mut config, endpoint)) = test_database() else {
        eprintln!("SANDBOX_TEST_PG_HOST not set, skipping");
        return;
    };
    config.port = endpoint.port;
    config.database = format!("missing_{}", unique_sandbox());

    let status = check_database_instance(&config, &endpoint.host).await;
    assert_eq!(status, InstanceStatus::NotFound);
}
