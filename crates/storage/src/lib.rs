use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use tracing::warn;

use shared::{
    domain::Role,
    protocol::{extract_identifier, identity_from_profile},
    session::{SessionRepository, SessionState},
};

/// Key under which the active role tag is stored, independent of the
/// profile blob so the role can be checked without deserializing it.
const USER_ROLE_KEY: &str = "userRole";

/// Durable key-value store for session state, backed by sqlite.
///
/// The browser original kept this in local storage; here it is a single
/// two-column table so the session survives process restarts within the
/// same client installation. All values are strings, no expiry.
#[derive(Clone)]
pub struct SessionStore {
    pool: Pool<Sqlite>,
}

impl SessionStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // An in-memory database exists per connection; a wider pool would
        // hand out empty databases.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        let store = Self { pool };
        store.ensure_entries_table().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_entries_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session_entries (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure session_entries table exists")?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM session_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO session_entries (key, value, updated_at)
             VALUES (?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM session_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Unconditional wipe of every stored key, not a selective removal.
    pub async fn clear_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM session_entries")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Resolves the identity's identifier: the profile payload first (via the
    /// ordered extraction strategies), then the separately stored bare id.
    async fn resolve_identifier(&self, role: Role, profile: &Value) -> Result<Option<String>> {
        if let Some(id) = extract_identifier(role, profile) {
            return Ok(Some(id));
        }
        self.get(&role.id_store_key()).await
    }
}

#[async_trait]
impl SessionRepository for SessionStore {
    async fn save_identifier(&self, role: Role, id: &str) -> Result<()> {
        self.set(USER_ROLE_KEY, role.as_str()).await?;
        self.set(&role.id_store_key(), id).await?;
        Ok(())
    }

    async fn save_profile(&self, role: Role, profile: &Value) -> Result<()> {
        self.set(USER_ROLE_KEY, role.as_str()).await?;
        self.set(&role.data_key(), &profile.to_string()).await?;
        Ok(())
    }

    async fn load(&self) -> Result<SessionState> {
        let Some(tag) = self.get(USER_ROLE_KEY).await? else {
            return Ok(SessionState::Absent);
        };
        let Some(role) = Role::from_tag(&tag) else {
            warn!(tag, "session: unknown role tag, clearing corrupt session");
            self.clear_all().await?;
            return Ok(SessionState::Wiped);
        };

        let Some(raw) = self.get(&role.data_key()).await? else {
            // Identifier-only sessions (profile fetch failed at login) are
            // still logged out from the caller's perspective.
            return Ok(SessionState::Absent);
        };

        let profile: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(role = role.as_str(), %err, "session: malformed profile blob, clearing");
                self.clear_all().await?;
                return Ok(SessionState::Wiped);
            }
        };

        let Some(id) = self.resolve_identifier(role, &profile).await? else {
            warn!(
                role = role.as_str(),
                "session: profile has no recognizable identifier, clearing"
            );
            self.clear_all().await?;
            return Ok(SessionState::Wiped);
        };

        Ok(SessionState::Active(identity_from_profile(role, &id, profile)))
    }

    async fn clear(&self) -> Result<()> {
        self.clear_all().await
    }

    async fn set_remember(&self, role: Role) -> Result<()> {
        self.set(role.remember_key(), "true").await
    }

    async fn remembered(&self, role: Role) -> Result<bool> {
        Ok(self.get(role.remember_key()).await?.as_deref() == Some("true"))
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
