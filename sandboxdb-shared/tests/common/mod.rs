//! Shared helpers for integration tests
//!
//! Tests that need a live PostgreSQL read its coordinates from:
//!
//! - `SANDBOX_TEST_PG_HOST` (required; tests are skipped when unset)
//! - `SANDBOX_TEST_PG_PORT` (default: 5432)
//! - `SANDBOX_TEST_PG_USER` (default: postgres)
//! - `SANDBOX_TEST_PG_PASSWORD` (default: postgres)
//! - `SANDBOX_TEST_PG_NAME` (default: sandbox_test)
//!
//! ```bash
//! export SANDBOX_TEST_PG_HOST=localhost
//! cargo test -p sandboxdb-shared --test provision_tests
//! ```

#![allow(dead_code)]

use async_trait::async_trait;
use sandboxdb_shared::auth::password::{CredentialHasher, HasherParams};
use sandboxdb_shared::db::connection::{connect, SandboxDbConfig};
use sandboxdb_shared::endpoint::{ConnectionMode, Endpoint, EndpointResolver, ResolvedEndpoint};
use sandboxdb_shared::k8s::{K8sError, K8sResult, PortForwarder};
use sqlx::postgres::PgConnection;
use sqlx::Connection;
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpStream;

/// Live database coordinates, or None when integration tests are disabled
pub fn test_database() -> Option<(SandboxDbConfig, Endpoint)> {
    let host = env::var("SANDBOX_TEST_PG_HOST").ok()?;
    let port = env::var("SANDBOX_TEST_PG_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5432);

    let config = SandboxDbConfig {
        port,
        user: env::var("SANDBOX_TEST_PG_USER").unwrap_or_else(|_| "postgres".to_string()),
        password: env::var("SANDBOX_TEST_PG_PASSWORD").unwrap_or_else(|_| "postgres".to_string()),
        database: env::var("SANDBOX_TEST_PG_NAME").unwrap_or_else(|_| "sandbox_test".to_string()),
    };

    Some((config, Endpoint { host, port }))
}

/// Cheap Argon2 costs so tests stay fast
pub fn fast_hasher() -> CredentialHasher {
    CredentialHasher::new(HasherParams {
        time_cost: 1,
        memory_cost: 1024,
        parallelism: 1,
        ..HasherParams::default()
    })
    .expect("test hasher params are valid")
}

/// A sandbox name no other test run uses
pub fn unique_sandbox() -> String {
    format!("t{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}

/// Opens a connection to the test database
pub async fn open(config: &SandboxDbConfig, endpoint: &Endpoint) -> PgConnection {
    connect(&config.connect_options(&endpoint.host, endpoint.port))
        .await
        .expect("Failed to connect to test database")
}

/// Creates the sandbox `users` table if it is missing
pub async fn ensure_users_table(conn: &mut PgConnection) {
    let mut tx = conn.begin().await.expect("begin");

    // Serialize concurrent test setup
    sqlx::query("SELECT pg_advisory_xact_lock(727274)")
        .execute(&mut *tx)
        .await
        .expect("advisory lock");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            email VARCHAR(255) NOT NULL UNIQUE,
            display_name VARCHAR(255) NOT NULL,
            pass_crypt VARCHAR(255) NOT NULL,
            data_public BOOLEAN NOT NULL DEFAULT FALSE,
            email_valid BOOLEAN NOT NULL DEFAULT FALSE,
            status TEXT NOT NULL DEFAULT 'pending',
            terms_seen BOOLEAN NOT NULL DEFAULT FALSE,
            terms_agreed TIMESTAMP,
            tou_agreed TIMESTAMP,
            creation_time TIMESTAMP NOT NULL,
            changesets_count INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(&mut *tx)
    .await
    .expect("create users table");

    tx.commit().await.expect("commit");
}

/// Resolver that always returns the test database endpoint
pub struct StaticResolver(pub Endpoint);

#[async_trait]
impl EndpointResolver for StaticResolver {
    fn mode(&self) -> ConnectionMode {
        ConnectionMode::Direct
    }

    async fn resolve(&self, _sandbox: &str) -> K8sResult<ResolvedEndpoint> {
        Ok(ResolvedEndpoint::direct(self.0.clone()))
    }
}

/// Forwards tunnel connections to a fixed `host:port` instead of a pod
pub struct LoopbackForwarder {
    pub pod: String,
    pub target: String,
    pub forwarded: AtomicUsize,
}

impl LoopbackForwarder {
    pub fn new(pod: &str, target: String) -> Self {
        Self {
            pod: pod.to_string(),
            target,
            forwarded: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PortForwarder for LoopbackForwarder {
    async fn check_pod(&self, pod: &str) -> K8sResult<()> {
        if pod == self.pod {
            Ok(())
        } else {
            Err(K8sError::PodNotFound { name: pod.into() })
        }
    }

    async fn forward(&self, _pod: &str, _port: u16, mut local: TcpStream) -> K8sResult<()> {
        self.forwarded.fetch_add(1, Ordering::SeqCst);
        let mut upstream = TcpStream::connect(self.target.as_str()).await?;
        tokio::io::copy_bidirectional(&mut local, &mut upstream).await?;
        Ok(())
    }
}
