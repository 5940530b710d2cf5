//! # sandboxdb Shared Library
//!
//! Core logic for reaching per-tenant sandbox databases: probing whether a
//! sandbox database is up, and provisioning users into it.
//!
//! ## Module Organization
//!
//! - `auth`: Argon2id credential hashing
//! - `db`: Sandbox database settings, single connections, liveness probe
//! - `models`: The sandbox `users` table
//! - `k8s`: Port-forward tunnels to cluster workloads
//! - `endpoint`: Direct vs. tunneled endpoint resolution
//! - `provision`: The provisioning flow tying the above together

pub mod auth;
pub mod db;
pub mod endpoint;
pub mod k8s;
pub mod models;
pub mod provision;

/// Current version of the sandboxdb shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
