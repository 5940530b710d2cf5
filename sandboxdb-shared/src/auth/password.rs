/// Credential hashing for sandbox users using Argon2id
///
/// Sandbox users are provisioned with their user name as the initial
/// credential. The value stored in `users.pass_crypt` is an Argon2id PHC string
/// produced by [`CredentialHasher`].
///
/// # Parameters
///
/// Cost settings are carried in [`HasherParams`] so they can be tuned from
/// configuration. The defaults are:
///
/// - **Iterations**: 16 passes
/// - **Memory**: 64 MB (65536 KB)
/// - **Parallelism**: 2 lanes
/// - **Output**: 32-byte hash
/// - **Salt**: 16 random bytes
///
/// Every call draws a fresh salt, so hashing the same input twice yields two
/// different strings. Both verify against the original input.
///
/// # Example
///
/// ```
/// use sandboxdb_shared::auth::password::{verify_password, CredentialHasher, HasherParams};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let params = HasherParams {
///     time_cost: 1,
///     memory_cost: 1024,
///     ..HasherParams::default()
/// };
/// let hasher = CredentialHasher::new(params)?;
///
/// let hash = hasher.hash("alice")?;
/// assert!(verify_password("alice", &hash)?);
/// assert!(!verify_password("bob", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{
        rand_core::{OsRng, RngCore},
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, ParamsBuilder, Version,
};
use serde::{Deserialize, Serialize};

/// Smallest accepted salt length in bytes
pub const MIN_SALT_LEN: usize = 8;

/// Largest salt length that still fits a PHC salt field (64 base64 characters)
pub const MAX_SALT_LEN: usize = 48;

/// Error type for credential hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Cost parameters were rejected
    #[error("Invalid hasher parameters: {0}")]
    InvalidParams(String),

    /// Failed to hash the credential
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify the credential
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Argon2id cost settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasherParams {
    /// Number of passes over memory
    pub time_cost: u32,

    /// Memory size in KB
    pub memory_cost: u32,

    /// Degree of parallelism (lanes)
    pub parallelism: u32,

    /// Length of the derived hash in bytes
    pub hash_len: usize,

    /// Length of the random salt in bytes
    pub salt_len: usize,
}

impl Default for HasherParams {
    fn default() -> Self {
        Self {
            time_cost: 16,
            memory_cost: 65536,
            parallelism: 2,
            hash_len: 32,
            salt_len: 16,
        }
    }
}

/// Argon2id hasher with fixed cost parameters
///
/// Construct once from [`HasherParams`]; the instance is cheap to clone and
/// can be moved onto a blocking thread for the actual hashing work.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    params: HasherParams,
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("params", &self.params)
            .finish()
    }
}

impl CredentialHasher {
    /// Builds a hasher from the given cost parameters
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::InvalidParams` if Argon2 rejects the costs or
    /// the salt length is outside `MIN_SALT_LEN..=MAX_SALT_LEN`.
    pub fn new(params: HasherParams) -> Result<Self, PasswordError> {
        if !(MIN_SALT_LEN..=MAX_SALT_LEN).contains(&params.salt_len) {
            return Err(PasswordError::InvalidParams(format!(
                "salt length must be between {} and {} bytes, got {}",
                MIN_SALT_LEN, MAX_SALT_LEN, params.salt_len
            )));
        }

        let argon2_params = ParamsBuilder::new()
            .m_cost(params.memory_cost)
            .t_cost(params.time_cost)
            .p_cost(params.parallelism)
            .output_len(params.hash_len)
            .build()
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params),
            params,
        })
    }

    /// Returns the cost parameters this hasher was built with
    pub fn params(&self) -> HasherParams {
        self.params
    }

    /// Hashes a credential with a freshly generated salt
    ///
    /// # Returns
    ///
    /// PHC string format hash, for example:
    /// ```text
    /// $argon2id$v=19$m=65536,t=16,p=2$c2FsdHNhbHRzYWx0$hash...
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::HashError` if hashing fails
    pub fn hash(&self, secret: &str) -> Result<String, PasswordError> {
        let mut salt_bytes = vec![0u8; self.params.salt_len];
        OsRng.fill_bytes(&mut salt_bytes);

        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| PasswordError::HashError(format!("Salt encoding failed: {}", e)))?;

        let password_hash = self
            .argon2
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

        Ok(password_hash.to_string())
    }
}

/// Verifies a credential against a PHC hash string
///
/// Parameters are read back from the hash itself, so hashes produced with any
/// `HasherParams` verify here.
///
/// # Errors
///
/// Returns `PasswordError::InvalidHash` when the hash cannot be parsed and
/// `PasswordError::VerifyError` for any other verification failure.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}
