/// Sandbox user model and database operations
///
/// Each sandbox database carries an OpenStreetMap-style `users` table. A
/// provisioned user is keyed by a derived email address; inserting the same
/// email twice is a no-op (first write wins, nothing is updated).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     display_name VARCHAR(255) NOT NULL,
///     pass_crypt VARCHAR(255) NOT NULL,
///     data_public BOOLEAN NOT NULL DEFAULT FALSE,
///     email_valid BOOLEAN NOT NULL DEFAULT FALSE,
///     status TEXT NOT NULL DEFAULT 'pending',
///     terms_seen BOOLEAN NOT NULL DEFAULT FALSE,
///     terms_agreed TIMESTAMP,
///     tou_agreed TIMESTAMP,
///     creation_time TIMESTAMP NOT NULL,
///     changesets_count INTEGER NOT NULL DEFAULT 0
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use sandboxdb_shared::models::sandbox_user::{derive_email, NewSandboxUser, SandboxUser};
/// use sqlx::postgres::PgConnection;
///
/// # async fn example(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
/// let email = derive_email("acme", "alice", "sandbox.test");
/// let new_user = NewSandboxUser::active(email.clone(), "alice", "$argon2id$...".to_string());
///
/// let outcome = SandboxUser::insert_if_absent(conn, &new_user).await?;
/// println!("{}: {:?}", email, outcome);
///
/// let stored = SandboxUser::find_by_email(conn, &email).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnection;
use sqlx::Connection;

/// Status assigned to every provisioned user
pub const ACTIVE_STATUS: &str = "active";

/// Builds the email a sandbox user is keyed by
///
/// Format: `{user_name}@{sandbox}.{domain}`
pub fn derive_email(sandbox: &str, user_name: &str, domain: &str) -> String {
    format!("{}@{}.{}", user_name, sandbox, domain)
}

/// A row of the sandbox `users` table
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SandboxUser {
    /// Unique email address
    pub email: String,

    /// Display name (the provisioned user name)
    pub display_name: String,

    /// Argon2id PHC string
    pub pass_crypt: String,

    /// Whether the user's edits are public
    pub data_public: bool,

    /// Whether the email is considered confirmed
    pub email_valid: bool,

    /// Account status (e.g. "active")
    pub status: String,

    /// Whether the contributor terms were shown
    pub terms_seen: bool,

    /// When the contributor terms were accepted
    pub terms_agreed: Option<NaiveDateTime>,

    /// When the terms of use were accepted
    pub tou_agreed: Option<NaiveDateTime>,

    /// When the row was created
    pub creation_time: NaiveDateTime,

    /// Number of changesets uploaded
    pub changesets_count: i32,
}

/// Input for provisioning a new sandbox user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSandboxUser {
    pub email: String,
    pub display_name: String,
    /// Argon2id hash (NOT the plaintext credential)
    pub pass_crypt: String,
    pub data_public: bool,
    pub email_valid: bool,
    pub status: String,
    pub terms_seen: bool,
    pub terms_agreed: NaiveDateTime,
    pub tou_agreed: NaiveDateTime,
    pub creation_time: NaiveDateTime,
    pub changesets_count: i32,
}

impl NewSandboxUser {
    /// A ready-to-use account: public, confirmed, active, terms accepted now
    pub fn active(email: String, display_name: &str, pass_crypt: String) -> Self {
        // Columns are `timestamp without time zone` holding server-local time
        let now = Local::now().naive_local();
        Self {
            email,
            display_name: display_name.to_string(),
            pass_crypt,
            data_public: true,
            email_valid: true,
            status: ACTIVE_STATUS.to_string(),
            terms_seen: true,
            terms_agreed: now,
            tou_agreed: now,
            creation_time: now,
            changesets_count: 0,
        }
    }
}

/// What an idempotent insert did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertOutcome {
    /// A new row was written
    Created,

    /// A row with the same email already existed and was left untouched
    AlreadyExists,
}

impl SandboxUser {
    /// Inserts a user unless one with the same email exists
    ///
    /// The statement runs in its own transaction, which is committed right
    /// after the insert. If anything fails before the commit, the transaction
    /// is rolled back when dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or a constraint other
    /// than the email uniqueness is violated.
    pub async fn insert_if_absent(
        conn: &mut PgConnection,
        data: &NewSandboxUser,
    ) -> Result<InsertOutcome, sqlx::Error> {
        let mut tx = conn.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (
                email, display_name, pass_crypt, data_public, email_valid, status,
                terms_seen, terms_agreed, tou_agreed, creation_time, changesets_count
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(&data.email)
        .bind(&data.display_name)
        .bind(&data.pass_crypt)
        .bind(data.data_public)
        .bind(data.email_valid)
        .bind(&data.status)
        .bind(data.terms_seen)
        .bind(data.terms_agreed)
        .bind(data.tou_agreed)
        .bind(data.creation_time)
        .bind(data.changesets_count)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(if result.rows_affected() == 0 {
            InsertOutcome::AlreadyExists
        } else {
            InsertOutcome::Created
        })
    }

    /// Finds a user by email address
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn find_by_email(
        conn: &mut PgConnection,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, SandboxUser>(
            r#"
            SELECT email, display_name, pass_crypt, data_public, email_valid, status,
                   terms_seen, terms_agreed, tou_agreed, creation_time, changesets_count
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(user)
    }

    /// Counts users with the given email (0 or 1 while the unique index holds)
    pub async fn count_by_email(conn: &mut PgConnection, email: &str) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&mut *conn)
            .await?;

        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_email() {
        assert_eq!(
            derive_email("acme", "alice", "sandbox.test"),
            "alice@acme.sandbox.test"
        );
    }

    #[test]
    fn test_derive_email_keeps_input_verbatim() {
        assert_eq!(
            derive_email("box-7", "Bob.Smith", "example.org"),
            "Bob.Smith@box-7.example.org"
        );
    }

    #[test]
    fn test_new_active_user_defaults() {
        let user = NewSandboxUser::active(
            "alice@acme.sandbox.test".to_string(),
            "alice",
            "$argon2id$fake".to_string(),
        );

        assert_eq!(user.display_name, "alice");
        assert!(user.data_public);
        assert!(user.email_valid);
        assert_eq!(user.status, "active");
        assert!(user.terms_seen);
        assert_eq!(user.changesets_count, 0);
        assert_eq!(user.terms_agreed, user.creation_time);
        assert_eq!(user.tou_agreed, user.creation_time);
    }

    #[test]
    fn test_new_active_user_uses_local_time() {
        let before = Local::now().naive_local();
        let user = NewSandboxUser::active("a@b.c".to_string(), "a", String::new());
        let after = Local::now().naive_local();

        assert!(before <= user.creation_time && user.creation_time <= after);
    }

    #[test]
    fn test_insert_outcome_serialization() {
        assert_eq!(
            serde_json::to_string(&InsertOutcome::AlreadyExists).unwrap(),
            "\"already_exists\""
        );
    }
}
