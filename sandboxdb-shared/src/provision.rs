/// Sandbox user provisioning
///
/// Provisioning creates one user in a sandbox's database:
///
/// ```text
/// SandboxProvisioner::provision()
///   ├─> validate sandbox and user names
///   ├─> resolve endpoint (direct, or tunnel opened)
///   ├─> insert_sandbox_user()
///   │     ├─> hash user name (Argon2id, blocking thread)
///   │     ├─> connect
///   │     ├─> INSERT ... ON CONFLICT (email) DO NOTHING, commit
///   │     └─> close connection (always)
///   └─> release endpoint (tunnel closed, always)
/// ```
///
/// Errors propagate to the caller only after every resource acquired along
/// the way has been released.
///
/// # Example
///
/// ```no_run
/// use sandboxdb_shared::auth::password::{CredentialHasher, HasherParams};
/// use sandboxdb_shared::db::connection::SandboxDbConfig;
/// use sandboxdb_shared::endpoint::DirectResolver;
/// use sandboxdb_shared::provision::SandboxProvisioner;
///
/// # async fn example(db: SandboxDbConfig) -> Result<(), Box<dyn std::error::Error>> {
/// let provisioner = SandboxProvisioner::new(
///     Box::new(DirectResolver::default()),
///     db,
///     CredentialHasher::new(HasherParams::default())?,
///     "sandbox.test",
/// );
///
/// let report = provisioner.provision("acme", "alice").await?;
/// println!("{} -> {:?}", report.email, report.outcome);
/// # Ok(())
/// # }
/// ```

use crate::auth::password::{CredentialHasher, PasswordError};
use crate::db::connection::{close_connection, connect, SandboxDbConfig};
use crate::endpoint::{ConnectionMode, Endpoint, EndpointResolver};
use crate::k8s::K8sError;
use crate::models::sandbox_user::{derive_email, InsertOutcome, NewSandboxUser, SandboxUser};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::{Validate, ValidationError, ValidationErrors};

/// Provisioning error types
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// Sandbox or user name failed validation
    #[error("Invalid provisioning request: {0}")]
    InvalidInput(#[from] ValidationErrors),

    /// The sandbox database endpoint could not be resolved
    #[error("Failed to reach sandbox database: {0}")]
    Resolve(#[from] K8sError),

    /// The credential could not be hashed
    #[error(transparent)]
    Hash(#[from] PasswordError),

    /// Connecting or inserting failed
    #[error("Sandbox database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Validated provisioning input
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProvisionRequest {
    /// Sandbox (tenant) name; `{sandbox}-db` must be a DNS-1123 label
    #[validate(
        length(min = 1, max = 60),
        custom(function = "validate_sandbox_name")
    )]
    pub sandbox: String,

    /// User name; becomes the display name and the email local part
    #[validate(
        length(min = 1, max = 255),
        custom(function = "validate_user_name")
    )]
    pub user: String,
}

fn validate_sandbox_name(name: &str) -> Result<(), ValidationError> {
    let valid_chars = name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');

    if !valid_chars || name.starts_with('-') {
        return Err(ValidationError::new("dns_label"));
    }
    Ok(())
}

fn validate_user_name(name: &str) -> Result<(), ValidationError> {
    if name.contains('@') || name.chars().any(char::is_whitespace) {
        return Err(ValidationError::new("email_local_part"));
    }
    Ok(())
}

/// Summary of a provisioning run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionReport {
    pub sandbox: String,
    pub user: String,
    pub email: String,
    pub endpoint: Endpoint,
    pub mode: ConnectionMode,
    pub outcome: InsertOutcome,
}

/// Connects to a sandbox database at `endpoint` and inserts `user_name`
///
/// The stored credential is the Argon2id hash of the user name. The
/// connection is closed whether or not the insert succeeds.
///
/// # Errors
///
/// Returns `ProvisionError::Hash` if hashing fails and
/// `ProvisionError::Database` if connecting or inserting fails.
#[instrument(skip(db, hasher, user_name), fields(endpoint = %endpoint))]
pub async fn insert_sandbox_user(
    endpoint: &Endpoint,
    db: &SandboxDbConfig,
    hasher: &CredentialHasher,
    email: &str,
    user_name: &str,
) -> Result<InsertOutcome, ProvisionError> {
    let pass_crypt = {
        let hasher = hasher.clone();
        let secret = user_name.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| PasswordError::HashError(e.to_string()))??
    };

    let new_user = NewSandboxUser::active(email.to_string(), user_name, pass_crypt);

    let mut conn = connect(&db.connect_options(&endpoint.host, endpoint.port)).await?;
    let result = SandboxUser::insert_if_absent(&mut conn, &new_user).await;
    close_connection(conn).await;

    Ok(result?)
}

/// Provisions users into sandbox databases
///
/// The endpoint strategy is injected at construction and used for every call.
pub struct SandboxProvisioner {
    resolver: Box<dyn EndpointResolver>,
    db: SandboxDbConfig,
    hasher: CredentialHasher,
    domain: String,
}

impl SandboxProvisioner {
    pub fn new(
        resolver: Box<dyn EndpointResolver>,
        db: SandboxDbConfig,
        hasher: CredentialHasher,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            db,
            hasher,
            domain: domain.into(),
        }
    }

    /// Connection mode of the injected resolver
    pub fn mode(&self) -> ConnectionMode {
        self.resolver.mode()
    }

    /// Email the given user is provisioned under
    pub fn email_for(&self, sandbox: &str, user: &str) -> String {
        derive_email(sandbox, user, &self.domain)
    }

    /// Creates `user` in the database of `sandbox` unless it already exists
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::InvalidInput` for malformed names, and the
    /// resolver, hashing or database error otherwise. Any tunnel opened for
    /// the call is closed before the error is returned.
    pub async fn provision(&self, sandbox: &str, user: &str) -> Result<ProvisionReport, ProvisionError> {
        let request = ProvisionRequest {
            sandbox: sandbox.to_string(),
            user: user.to_string(),
        };
        request.validate()?;

        let email = self.email_for(sandbox, user);
        let resolved = self.resolver.resolve(sandbox).await?;
        let endpoint = resolved.endpoint().clone();
        let mode = resolved.mode();

        let result = insert_sandbox_user(&endpoint, &self.db, &self.hasher, &email, user).await;
        resolved.release().await;
        let outcome = result?;

        info!(
            sandbox = %sandbox,
            email = %email,
            mode = ?mode,
            outcome = ?outcome,
            "Sandbox user provisioned"
        );

        Ok(ProvisionReport {
            sandbox: request.sandbox,
            user: request.user,
            email,
            endpoint,
            mode,
            outcome,
        })
    }
}
