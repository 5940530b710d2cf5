/// Database models for sandbox instances
///
/// # Models
///
/// - `sandbox_user`: rows of the sandbox `users` table and the idempotent insert

pub mod sandbox_user;
