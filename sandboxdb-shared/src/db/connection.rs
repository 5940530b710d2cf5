/// Sandbox database connection settings
///
/// Every sandbox runs its own PostgreSQL instance with the same credentials
/// and database name; only the host (and, behind a tunnel, the port) differs.
/// This module holds those shared settings and opens single, short-lived
/// connections from them. There is deliberately no pool: each operation opens
/// one connection and closes it before returning.
///
/// # Example
///
/// ```no_run
/// use sandboxdb_shared::db::connection::{close_connection, connect, SandboxDbConfig};
///
/// # async fn example() -> Result<(), sqlx::Error> {
/// let config = SandboxDbConfig {
///     user: "openstreetmap".to_string(),
///     password: "secret".to_string(),
///     database: "openstreetmap".to_string(),
///     ..Default::default()
/// };
///
/// let conn = connect(&config.connect_options("acme-db", config.port)).await?;
/// close_connection(conn).await;
/// # Ok(())
/// # }
/// ```

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tracing::{debug, warn};

/// Standard PostgreSQL port that sandbox database pods listen on
pub const STANDARD_PORT: u16 = 5432;

/// Credentials and coordinates shared by every sandbox database
#[derive(Clone)]
pub struct SandboxDbConfig {
    /// Port the database listens on
    ///
    /// Default: 5432
    pub port: u16,

    /// Database role used for both probing and provisioning
    pub user: String,

    /// Password for `user`
    pub password: String,

    /// Database name inside each sandbox instance
    pub database: String,
}

impl Default for SandboxDbConfig {
    fn default() -> Self {
        Self {
            port: STANDARD_PORT,
            user: String::new(),
            password: String::new(),
            database: String::new(),
        }
    }
}

impl std::fmt::Debug for SandboxDbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxDbConfig")
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .finish()
    }
}

impl SandboxDbConfig {
    /// Builds connect options for a specific host and port
    ///
    /// The port is passed explicitly because a tunneled connection reaches the
    /// database through an ephemeral local port rather than `self.port`.
    pub fn connect_options(&self, host: &str, port: u16) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(host)
            .port(port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }
}

/// Opens a single connection
///
/// # Errors
///
/// Returns the driver error unchanged so callers can classify it.
pub async fn connect(options: &PgConnectOptions) -> Result<PgConnection, sqlx::Error> {
    debug!("Opening sandbox database connection");
    PgConnection::connect_with(options).await
}

/// Closes a connection, logging instead of failing
///
/// Used on paths where a close error must not mask the result of the work
/// that ran on the connection.
pub async fn close_connection(conn: PgConnection) {
    if let Err(e) = conn.close().await {
        warn!(error = %e, "Failed to close sandbox database connection cleanly");
    } else {
        debug!("Sandbox database connection closed");
    }
}
