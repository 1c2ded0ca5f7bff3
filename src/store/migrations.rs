//! Embedded schema migrations.
//!
//! Migrations are applied sequentially inside transactions and tracked in
//! a `schema_migrations` table with a content checksum. Databases written
//! by the previous generation of the bot carry `created_at`/`updated_at`
//! columns on `users`; those are rebuilt to the current shape before the
//! tracked migrations run.

use sha2::{Digest, Sha256};
use sqlx::{Pool, Row, Sqlite};
use thiserror::Error;

/// Migration error types
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration {name} failed: {message}")]
    Failed { name: String, message: String },
}

/// A single migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Sequential version
    pub version: i64,
    /// Migration name
    pub name: &'static str,
    /// SQL statements, applied in order within one transaction
    pub statements: &'static [&'static str],
}

/// All migrations, in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL UNIQUE,
                name TEXT NOT NULL,
                voice TEXT NOT NULL DEFAULT 'female'
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_users_user_id ON users (user_id)",
        ],
    },
    Migration {
        version: 2,
        name: "normalize_voice_values",
        statements: &[
            // legacy databases stored 'women'; fold anything outside the
            // closed vocabulary onto the default
            "UPDATE users SET voice = 'female' WHERE voice NOT IN ('male', 'female')",
        ],
    },
];

/// Rebuild the legacy users table and apply all pending migrations.
/// Returns the number of migrations applied.
pub async fn run(pool: &Pool<Sqlite>) -> Result<usize, MigrationError> {
    rebuild_legacy_users_table(pool).await?;
    init_tracking_table(pool).await?;

    let applied = applied_versions(pool).await?;
    let mut count = 0;

    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }

        let mut tx = pool.begin().await?;
        for statement in migration.statements {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| MigrationError::Failed {
                    name: migration.name.to_string(),
                    message: e.to_string(),
                })?;
        }

        sqlx::query("INSERT INTO schema_migrations (version, name, checksum) VALUES (?1, ?2, ?3)")
            .bind(migration.version)
            .bind(migration.name)
            .bind(checksum(migration.statements))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(version = migration.version, name = migration.name, "applied migration");
        count += 1;
    }

    if count == 0 {
        tracing::debug!("no pending migrations");
    }

    Ok(count)
}

async fn init_tracking_table(pool: &Pool<Sqlite>) -> Result<(), MigrationError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            checksum TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn applied_versions(pool: &Pool<Sqlite>) -> Result<Vec<i64>, MigrationError> {
    let versions = sqlx::query_scalar("SELECT version FROM schema_migrations ORDER BY version ASC")
        .fetch_all(pool)
        .await?;

    Ok(versions)
}

const LEGACY_REBUILD: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users_new (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL UNIQUE,
        name TEXT NOT NULL,
        voice TEXT NOT NULL DEFAULT 'female'
    )
    "#,
    r#"
    INSERT OR IGNORE INTO users_new (id, user_id, name, voice)
    SELECT id, user_id, name, voice FROM users
    "#,
    "DROP TABLE users",
    "ALTER TABLE users_new RENAME TO users",
    "CREATE INDEX IF NOT EXISTS idx_users_user_id ON users (user_id)",
];

/// Detect and rebuild a users table from the previous bot generation.
/// Returns whether a rebuild happened.
pub async fn rebuild_legacy_users_table(pool: &Pool<Sqlite>) -> Result<bool, MigrationError> {
    let rows = sqlx::query("PRAGMA table_info(users)").fetch_all(pool).await?;
    if rows.is_empty() {
        // no users table yet, nothing to rebuild
        return Ok(false);
    }

    let columns: Vec<String> = rows.iter().map(|row| row.get("name")).collect();
    let legacy = columns
        .iter()
        .any(|column| column == "created_at" || column == "updated_at");
    if !legacy {
        return Ok(false);
    }

    tracing::info!("rebuilding legacy users table");

    let mut tx = pool.begin().await?;
    for statement in LEGACY_REBUILD {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .map_err(|e| MigrationError::Failed {
                name: "rebuild_legacy_users_table".to_string(),
                message: e.to_string(),
            })?;
    }
    tx.commit().await?;

    Ok(true)
}

fn checksum(statements: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for statement in statements {
        hasher.update(statement.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}
