use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

use crate::account::errors::AuthError;
use crate::account::models::EmailAddress;
use crate::account::models::LockoutState;
use crate::account::models::UserCredential;
use crate::account::models::UserId;
use crate::account::models::Username;
use crate::account::ports::UserCredentialRepository;

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Raw row shape for the credential subset of the users table.
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    is_active: bool,
    is_verified: bool,
    is_two_factor_enabled: bool,
    totp_secret: Option<String>,
    failed_login_attempts: i32,
    locked_until: Option<DateTime<Utc>>,
    last_login: Option<DateTime<Utc>>,
    password_changed_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_domain(self) -> Result<UserCredential, AuthError> {
        Ok(UserCredential {
            id: UserId(self.id),
            username: Username::new(self.username)?,
            email: EmailAddress::new(self.email)?,
            password_hash: self.password_hash,
            is_active: self.is_active,
            is_verified: self.is_verified,
            is_two_factor_enabled: self.is_two_factor_enabled,
            totp_secret: self.totp_secret,
            failed_login_attempts: self.failed_login_attempts,
            locked_until: self.locked_until,
            last_login: self.last_login,
            password_changed_at: self.password_changed_at,
            created_at: self.created_at,
        })
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, is_active, is_verified, \
     is_two_factor_enabled, totp_secret, failed_login_attempts, locked_until, last_login, \
     password_changed_at, created_at";

#[async_trait]
impl UserCredentialRepository for PostgresUserRepository {
    async fn find_by_username_or_email(
        &self,
        identifier: &str,
    ) -> Result<Option<UserCredential>, AuthError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $1"
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        row.map(UserRow::into_domain).transpose()
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserCredential>, AuthError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        row.map(UserRow::into_domain).transpose()
    }

    async fn record_login_failure(
        &self,
        id: &UserId,
        lock_threshold: i32,
        lock_until: DateTime<Utc>,
    ) -> Result<LockoutState, AuthError> {
        // One statement: concurrent failures on the same row serialize on the
        // row lock and each sees the incremented counter
        let row: Option<(i32, Option<DateTime<Utc>>)> = sqlx::query_as(
            r#"
            UPDATE users
            SET failed_login_attempts = failed_login_attempts + 1,
                locked_until = CASE
                    WHEN failed_login_attempts + 1 >= $2 THEN $3
                    ELSE locked_until
                END
            WHERE id = $1
            RETURNING failed_login_attempts, locked_until
            "#,
        )
        .bind(id.0)
        .bind(lock_threshold)
        .bind(lock_until)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        match row {
            Some((failed_attempts, locked_until)) => Ok(LockoutState {
                failed_attempts,
                locked_until,
            }),
            None => Err(AuthError::NotFound(id.to_string())),
        }
    }

    async fn record_login_success(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), AuthError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET failed_login_attempts = 0, locked_until = NULL, last_login = $2
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn update_password_hash(
        &self,
        id: &UserId,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, password_changed_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(password_hash)
        .bind(changed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn store_totp_secret(&self, id: &UserId, secret: &str) -> Result<(), AuthError> {
        let result = sqlx::query("UPDATE users SET totp_secret = $2 WHERE id = $1")
            .bind(id.0)
            .bind(secret)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn enable_two_factor(&self, id: &UserId) -> Result<(), AuthError> {
        let result = sqlx::query("UPDATE users SET is_two_factor_enabled = TRUE WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn disable_two_factor(&self, id: &UserId) -> Result<(), AuthError> {
        // Flag, secret, and backup codes clear together; no intermediate state
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_two_factor_enabled = FALSE, totp_secret = NULL, backup_codes = NULL
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound(id.to_string()));
        }

        Ok(())
    }
}
