/// Database layer for sandbox instances
///
/// # Modules
///
/// - `connection`: shared sandbox database settings and single-connection helpers
/// - `liveness`: connection probe that classifies a sandbox database's state
/// - The `users` table row is in the `models` module at crate root level
///
/// # Example
///
/// ```no_run
/// use sandboxdb_shared::db::connection::SandboxDbConfig;
/// use sandboxdb_shared::db::liveness::check_database_instance;
///
/// #[tokio::main]
/// async fn main() {
///     let config = SandboxDbConfig {
///         user: "openstreetmap".to_string(),
///         password: std::env::var("SANDBOX_PG_DB_PASSWORD").unwrap_or_default(),
///         database: "openstreetmap".to_string(),
///         ..Default::default()
///     };
///
///     let status = check_database_instance(&config, "acme-db").await;
///     println!("{}", status);
/// }
/// ```

pub mod connection;
pub mod liveness;
