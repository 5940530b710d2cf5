/// Sandbox database liveness probe
///
/// The probe opens one connection to a sandbox database and closes it again.
/// It never returns an error: every failure is folded into an
/// [`InstanceStatus`], so callers can report the state of a sandbox without
/// handling driver errors themselves.
///
/// # Classification
///
/// | Outcome | Status |
/// |---------|--------|
/// | Connected and closed | `running` |
/// | Refused / reset / timed out / no route to host or network | `not running` |
/// | Server rejected login or database, unknown host, handshake failure | `not found` |
/// | Anything else | `error: <detail>` |
///
/// # Example
///
/// ```no_run
/// use sandboxdb_shared::db::connection::SandboxDbConfig;
/// use sandboxdb_shared::db::liveness::{check_database_instance, InstanceStatus};
///
/// # async fn example(config: SandboxDbConfig) {
/// match check_database_instance(&config, "acme-db").await {
///     InstanceStatus::Running => println!("up"),
///     other => println!("sandbox database is {}", other),
/// }
/// # }
/// ```

use crate::db::connection::{connect, SandboxDbConfig};
use serde::{Deserialize, Serialize};
use sqlx::Connection;
use std::fmt;
use std::io::ErrorKind;
use tracing::{debug, info};

/// Result of probing a sandbox database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum InstanceStatus {
    /// The database accepted a connection
    Running,

    /// Nothing answered on the database port
    NotRunning,

    /// Something answered but the sandbox database is not there
    NotFound,

    /// The probe itself failed for a reason unrelated to connecting
    Error(String),
}

impl InstanceStatus {
    /// Returns true only for `Running`
    pub fn is_running(&self) -> bool {
        matches!(self, InstanceStatus::Running)
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceStatus::Running => write!(f, "running"),
            InstanceStatus::NotRunning => write!(f, "not running"),
            InstanceStatus::NotFound => write!(f, "not found"),
            InstanceStatus::Error(detail) => write!(f, "error: {}", detail),
        }
    }
}

/// Probes the sandbox database at `host`
///
/// Uses the configured port, user, password and database name. The
/// connection is closed immediately after it is established.
pub async fn check_database_instance(config: &SandboxDbConfig, host: &str) -> InstanceStatus {
    debug!(host = %host, port = config.port, "Probing sandbox database");

    let options = config.connect_options(host, config.port);
    let status = match connect(&options).await {
        Ok(conn) => match conn.close().await {
            Ok(()) => InstanceStatus::Running,
            Err(e) => InstanceStatus::Error(e.to_string()),
        },
        Err(e) => classify_connect_error(&e),
    };

    info!(host = %host, status = %status, "Sandbox database probe finished");
    status
}

/// Maps a connection-establishment error onto a probe status
pub fn classify_connect_error(err: &sqlx::Error) -> InstanceStatus {
    match err {
        sqlx::Error::Io(io) if is_unreachable(io.kind()) => InstanceStatus::NotRunning,
        sqlx::Error::Io(_)
        | sqlx::Error::Database(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_) => InstanceStatus::NotFound,
        other => InstanceStatus::Error(other.to_string()),
    }
}

fn is_unreachable(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::TimedOut
            | ErrorKind::AddrNotAvailable
            | ErrorKind::HostUnreachable
            | ErrorKind::NetworkUnreachable
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_display() {
        assert_eq!(InstanceStatus::Running.to_string(), "running");
        assert_eq!(InstanceStatus::NotRunning.to_string(), "not running");
        assert_eq!(InstanceStatus::NotFound.to_string(), "not found");
        assert_eq!(
            InstanceStatus::Error("boom".to_string()).to_string(),
            "error: boom"
        );
    }

    #[test]
    fn test_serialization_is_tagged() {
        let running = serde_json::to_value(InstanceStatus::Running).unwrap();
        assert_eq!(running, serde_json::json!({ "status": "running" }));

        let not_running = serde_json::to_value(InstanceStatus::NotRunning).unwrap();
        assert_eq!(not_running, serde_json::json!({ "status": "not_running" }));

        let error = serde_json::to_value(InstanceStatus::Error("bad".into())).unwrap();
        assert_eq!(
            error,
            serde_json::json!({ "status": "error", "detail": "bad" })
        );
    }

    #[test]
    fn test_refused_is_not_running() {
        let err = sqlx::Error::Io(io::Error::from(ErrorKind::ConnectionRefused));
        assert_eq!(classify_connect_error(&err), InstanceStatus::NotRunning);
    }

    #[test]
    fn test_timeout_is_not_running() {
        let err = sqlx::Error::Io(io::Error::from(ErrorKind::TimedOut));
        assert_eq!(classify_connect_error(&err), InstanceStatus::NotRunning);
    }

    #[test]
    fn test_no_route_is_not_running() {
        for kind in [ErrorKind::HostUnreachable, ErrorKind::NetworkUnreachable] {
            let err = sqlx::Error::Io(io::Error::from(kind));
            assert_eq!(classify_connect_error(&err), InstanceStatus::NotRunning, "{:?}", kind);
        }
    }

    #[test]
    fn test_lookup_failure_is_not_found() {
        let err = sqlx::Error::Io(io::Error::new(
            ErrorKind::Other,
            "failed to lookup address information",
        ));
        assert_eq!(classify_connect_error(&err), InstanceStatus::NotFound);
    }

    #[test]
    fn test_protocol_failure_is_not_found() {
        let err = sqlx::Error::Protocol("unexpected message".to_string());
        assert_eq!(classify_connect_error(&err), InstanceStatus::NotFound);
    }

    #[test]
    fn test_configuration_failure_is_error() {
        let err = sqlx::Error::Configuration("bad option".into());
        let status = classify_connect_error(&err);
        assert!(matches!(status, InstanceStatus::Error(ref detail) if detail.contains("bad option")));
        assert!(!status.is_running());
    }
}
