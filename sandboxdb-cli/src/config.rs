/// Configuration management for the sandboxdb CLI
///
/// This module loads configuration from environment variables (a `.env` file
/// is honored for development) and provides a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `SANDBOX_PG_DB_PORT`: Sandbox database port (default: 5432)
/// - `SANDBOX_PG_DB_USER`: Sandbox database user (required)
/// - `SANDBOX_PG_DB_PASSWORD`: Sandbox database password (required)
/// - `SANDBOX_PG_DB_NAME`: Sandbox database name (required)
/// - `SANDBOX_DOMAIN`: Domain suffix for provisioned emails (required to provision)
/// - `ENVIRONMENT`: `development` tunnels through the cluster API (default: production)
/// - `SANDBOX_NAMESPACE`: Namespace of sandbox pods (default: kube client default)
/// - `SANDBOX_ARGON2_TIME_COST`: Argon2 iterations (default: 16)
/// - `SANDBOX_ARGON2_MEMORY_COST`: Argon2 memory in KB (default: 65536)
/// - `SANDBOX_ARGON2_PARALLELISM`: Argon2 lanes (default: 2)
/// - `SANDBOX_ARGON2_HASH_LEN`: Argon2 output bytes (default: 32)
/// - `SANDBOX_ARGON2_SALT_LEN`: Argon2 salt bytes (default: 16)
/// - `RUST_LOG`: Log level (default: info)
///
/// # Example
///
/// ```no_run
/// use sandboxdb_cli::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Provisioning emails under {}", config.require_domain()?);
/// # Ok(())
/// # }
/// ```

use sandboxdb_shared::auth::password::HasherParams;
use sandboxdb_shared::db::connection::{SandboxDbConfig, STANDARD_PORT};
use sandboxdb_shared::endpoint::Environment;
use std::env;
use std::str::FromStr;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Sandbox database settings
    pub db: SandboxDbConfig,

    /// Domain suffix for provisioned emails; only provisioning needs it
    pub domain: Option<String>,

    /// Deployment environment (selects direct or tunneled access)
    pub environment: Environment,

    /// Namespace sandbox pods live in
    pub namespace: Option<String>,

    /// Argon2 cost settings for provisioned credentials
    pub hasher: HasherParams,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))
        };

        let defaults = HasherParams::default();

        let db = SandboxDbConfig {
            port: parse_or(&lookup, "SANDBOX_PG_DB_PORT", STANDARD_PORT)?,
            user: required("SANDBOX_PG_DB_USER")?,
            password: required("SANDBOX_PG_DB_PASSWORD")?,
            database: required("SANDBOX_PG_DB_NAME")?,
        };

        let domain = lookup("SANDBOX_DOMAIN").filter(|d| !d.is_empty());

        let environment = lookup("ENVIRONMENT")
            .map(|name| Environment::from_name(&name))
            .unwrap_or(Environment::Production);

        let namespace = lookup("SANDBOX_NAMESPACE").filter(|ns| !ns.is_empty());

        let hasher = HasherParams {
            time_cost: parse_or(&lookup, "SANDBOX_ARGON2_TIME_COST", defaults.time_cost)?,
            memory_cost: parse_or(&lookup, "SANDBOX_ARGON2_MEMORY_COST", defaults.memory_cost)?,
            parallelism: parse_or(&lookup, "SANDBOX_ARGON2_PARALLELISM", defaults.parallelism)?,
            hash_len: parse_or(&lookup, "SANDBOX_ARGON2_HASH_LEN", defaults.hash_len)?,
            salt_len: parse_or(&lookup, "SANDBOX_ARGON2_SALT_LEN", defaults.salt_len)?,
        };

        Ok(Self {
            db,
            domain,
            environment,
            namespace,
            hasher,
        })
    }

    /// Email domain, or an error naming the missing variable
    pub fn require_domain(&self) -> anyhow::Result<&str> {
        self.domain
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("SANDBOX_DOMAIN environment variable is required to provision"))
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value {:?}: {}", key, raw, e)),
        None => Ok(default),
    }
}
