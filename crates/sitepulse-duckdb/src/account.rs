use anyhow::Result;
use serde::Serialize;

use crate::backend::rand_hex;
use crate::DuckDbBackend;

/// A dashboard account as exposed to API callers (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
}

/// A user row together with its stored password hash, for login.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

impl DuckDbBackend {
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = ?1")?;
        let mut rows = stmt.query_map(duckdb::params![key], |row| row.get::<_, String>(0))?;
        let value = rows.next().transpose()?;
        Ok(value)
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
            duckdb::params![key, value],
        )?;
        Ok(())
    }

    /// Ensure a JWT secret exists in settings. If not, generate one.
    /// Returns the JWT secret.
    pub async fn ensure_jwt_secret(&self) -> Result<String> {
        if let Some(secret) = self.get_setting("jwt_secret").await? {
            return Ok(secret);
        }
        let secret = rand_hex(32);
        self.set_setting("jwt_secret", &secret).await?;
        Ok(secret)
    }

    /// Create an account. Returns `None` when the email is already taken.
    ///
    /// `email` must already be normalised (trimmed, lowercased).
    pub async fn create_user(&self, email: &str, password_hash: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().await;
        let taken: i64 = conn
            .prepare("SELECT COUNT(*) FROM users WHERE email = ?1")?
            .query_row(duckdb::params![email], |row| row.get(0))?;
        if taken > 0 {
            return Ok(None);
        }

        let id = uuid::Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO users (id, email, password_hash, created_at) \
             VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)",
            duckdb::params![id, email, password_hash],
        )?;
        Ok(Some(User {
            id,
            email: email.to_string(),
        }))
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserCredentials>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT id, email, password_hash FROM users WHERE email = ?1")?;
        let mut rows = stmt.query_map(duckdb::params![email], |row| {
            Ok(UserCredentials {
                user: User {
                    id: row.get(0)?,
                    email: row.get(1)?,
                },
                password_hash: row.get(2)?,
            })
        })?;
        let found = rows.next().transpose()?;
        Ok(found)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT id, email FROM users WHERE id = ?1")?;
        let mut rows = stmt.query_map(duckdb::params![user_id], |row| {
            Ok(User {
                id: row.get(0)?,
                email: row.get(1)?,
            })
        })?;
        let found = rows.next().transpose()?;
        Ok(found)
    }
}
