//! Voice profile persistence.
//!
//! SQLite-backed storage for user registrations and their voice
//! preference. The table is tiny on purpose: one row per user, keyed by
//! the Telegram user id.

pub mod migrations;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use thiserror::Error;

use crate::tts::VoicePreference;

/// Store error types
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Aggregate usage numbers for the stats command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserStats {
    pub total: i64,
    pub male: i64,
    pub female: i64,
}

/// SQLite-backed voice profile store
#[derive(Clone)]
pub struct VoiceProfileStore {
    pool: Pool<Sqlite>,
}

impl VoiceProfileStore {
    /// Open (and create if missing) the database at `path`.
    ///
    /// `:memory:` is accepted for ephemeral runs. Schema setup is not
    /// done here; call [`migrations::run`] before serving traffic.
    pub async fn connect(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(StoreError::Database)?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Register a user if not already present. Existing rows, and their
    /// voice preference, are left untouched.
    pub async fn register_user(&self, user_id: i64, name: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO users (user_id, name, voice)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(VoicePreference::default().as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Voice preference for a user; unknown users get the default.
    pub async fn voice_for(&self, user_id: i64) -> Result<VoicePreference> {
        let row = sqlx::query("SELECT voice FROM users WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row
            .map(|row| VoicePreference::parse(&row.get::<String, _>("voice")))
            .unwrap_or_default())
    }

    /// Update a user's stored voice preference.
    pub async fn set_voice(&self, user_id: i64, voice: VoicePreference) -> Result<()> {
        sqlx::query("UPDATE users SET voice = ?1 WHERE user_id = ?2")
            .bind(voice.as_str())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Aggregate counts by stored preference.
    pub async fn stats(&self) -> Result<UserStats> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let male: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE voice = ?1")
            .bind(VoicePreference::Male.as_str())
            .fetch_one(&self.pool)
            .await?;

        let female: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE voice = ?1")
            .bind(VoicePreference::Female.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(UserStats {
            total,
            male,
            female,
        })
    }

    /// Every registered user id, in registration order.
    pub async fn all_user_ids(&self) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar("SELECT user_id FROM users ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }
}
