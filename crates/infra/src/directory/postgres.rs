//! Postgres-backed user directory.
//!
//! Passwords are stored as bcrypt hashes produced by `pgcrypto`
//! (`crypt(password, gen_salt('bf'))`); comparisons happen in SQL against the
//! stored hash, so raw passwords never leave the request.
//!
//! Each row also carries `password_digest`, an HMAC-SHA256 of the password
//! under a server pepper. The shared-password check is an indexed lookup on
//! that column instead of a bcrypt round per row.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use gatehouse_auth::{
    DirectoryError, Registration, Role, SigningSecret, UserDirectory, UserRecord,
};

const SCHEMA: &[&str] = &[
    "CREATE EXTENSION IF NOT EXISTS pgcrypto",
    r#"
    CREATE TABLE IF NOT EXISTS users (
        email      TEXT PRIMARY KEY,
        fullname   TEXT NOT NULL,
        password   TEXT NOT NULL,
        role       TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "ALTER TABLE users ADD COLUMN IF NOT EXISTS password_digest BYTEA",
    "CREATE INDEX IF NOT EXISTS users_password_digest_idx ON users (password_digest)",
];

const PASSWORD_DIGEST: &str = "hmac(convert_to($1, 'UTF8'), $2, 'sha256')";

fn duplicate_password_sql() -> String {
    format!(
        "SELECT EXISTS (SELECT 1 FROM users WHERE password_digest = {PASSWORD_DIGEST}) AS taken"
    )
}

fn insert_user_sql() -> String {
    format!(
        "INSERT INTO users (email, fullname, password, password_digest, role) \
         VALUES ($3, $4, crypt($1, gen_salt('bf')), {PASSWORD_DIGEST}, $5) \
         RETURNING email"
    )
}

/// User directory over a `users` table.
///
/// Uses a SQLx connection pool (Arc + Send + Sync internally); every call is
/// a single async statement, so nothing blocks the runtime.
#[derive(Debug, Clone)]
pub struct PostgresUserDirectory {
    pool: PgPool,
    pepper: SigningSecret,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool, pepper: SigningSecret) -> Self {
        Self { pool, pepper }
    }

    pub async fn connect(
        database_url: &str,
        pepper: SigningSecret,
    ) -> Result<Self, DirectoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(unavailable)?;
        tracing::debug!("connected to postgres user directory");
        Ok(Self::new(pool, pepper))
    }

    /// Create the extension and table if missing. Idempotent.
    pub async fn migrate(&self) -> Result<(), DirectoryError> {
        for statement in SCHEMA {
            sqlx::query(*statement)
                .execute(&self.pool)
                .await
                .map_err(unavailable)?;
        }
        tracing::info!("user directory schema ready");
        Ok(())
    }
}

fn unavailable(e: sqlx::Error) -> DirectoryError {
    DirectoryError::Unavailable(e.to_string())
}

fn parse_role(raw: &str) -> Result<Role, DirectoryError> {
    raw.parse::<Role>()
        .map_err(|e| DirectoryError::Unavailable(format!("corrupt role column: {e}")))
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn authenticate(&self, email: &str, password: &str) -> Result<String, DirectoryError> {
        let row = sqlx::query(
            r#"
            SELECT email, password = crypt($2, password) AS matches
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .bind(password)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?
        .ok_or(DirectoryError::NotFound)?;

        let matches: bool = row.try_get("matches").map_err(unavailable)?;
        if !matches {
            return Err(DirectoryError::InvalidCredentials);
        }
        row.try_get("email").map_err(unavailable)
    }

    async fn fetch_role(&self, email: &str) -> Result<Role, DirectoryError> {
        let row = sqlx::query("SELECT role FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?
            .ok_or(DirectoryError::NotFound)?;

        let role: String = row.try_get("role").map_err(unavailable)?;
        parse_role(&role)
    }

    async fn is_duplicate_email(&self, email: &str) -> Result<bool, DirectoryError> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1) AS taken")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)?;
        row.try_get("taken").map_err(unavailable)
    }

    async fn is_duplicate_password(&self, password: &str) -> Result<bool, DirectoryError> {
        let row = sqlx::query(&duplicate_password_sql())
            .bind(password)
            .bind(self.pepper.as_bytes())
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)?;
        row.try_get("taken").map_err(unavailable)
    }

    async fn insert_user(&self, registration: &Registration) -> Result<String, DirectoryError> {
        let result = sqlx::query(&insert_user_sql())
            .bind(&registration.password)
            .bind(self.pepper.as_bytes())
            .bind(registration.email.as_str())
            .bind(&registration.fullname)
            .bind(registration.role.as_str())
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => row.try_get("email").map_err(unavailable),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(DirectoryError::Rejected("email is already exist".to_string()))
            }
            Err(e) => Err(unavailable(e)),
        }
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, DirectoryError> {
        let rows = sqlx::query("SELECT email, role FROM users ORDER BY email")
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;

        rows.iter()
            .map(|row| {
                let email: String = row.try_get("email").map_err(unavailable)?;
                let role: String = row.try_get("role").map_err(unavailable)?;
                Ok(UserRecord {
                    email,
                    role: parse_role(&role)?,
                })
            })
            .collect()
    }
}
