/// Credential utilities for sandbox users
///
/// # Modules
///
/// - [`password`]: Argon2id hashing of provisioned credentials
///
/// # Example
///
/// ```no_run
/// use sandboxdb_shared::auth::password::{verify_password, CredentialHasher, HasherParams};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hasher = CredentialHasher::new(HasherParams::default())?;
/// let hash = hasher.hash("alice")?;
/// assert!(verify_password("alice", &hash)?);
/// # Ok(())
/// # }
/// ```

pub mod password;
