//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all application data. List-valued fields
//! (photo paths) and snapshot blobs are stored as JSON text.

mod amenities;
mod inspections;
mod issues;
mod reports;
mod repository;
mod sessions;
mod settings;
mod stations;
mod users;

pub use repository::*;
pub use users::NewUser;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::models::DEFAULT_AMENITY_TYPES;

/// Initialize the database connection pool, run migrations and seed reference data.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    seed_amenity_types(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stations (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            code TEXT NOT NULL UNIQUE,
            region TEXT NOT NULL,
            address TEXT,
            latitude REAL,
            longitude REAL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL,
            station_id TEXT REFERENCES stations(id),
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS amenity_types (
            id TEXT PRIMARY KEY,
            key TEXT NOT NULL UNIQUE,
            label TEXT NOT NULL,
            description TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS station_amenities (
            id TEXT PRIMARY KEY,
            station_id TEXT NOT NULL REFERENCES stations(id),
            amenity_type_id TEXT NOT NULL REFERENCES amenity_types(id),
            name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'ok',
            last_inspected_at TEXT,
            notes TEXT,
            photos TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS issues (
            id TEXT PRIMARY KEY,
            station_id TEXT NOT NULL REFERENCES stations(id),
            amenity_id TEXT REFERENCES station_amenities(id) ON DELETE SET NULL,
            reporter_id TEXT REFERENCES users(id) ON DELETE SET NULL,
            assignee_id TEXT REFERENCES users(id) ON DELETE SET NULL,
            title TEXT NOT NULL,
            description TEXT,
            priority TEXT NOT NULL DEFAULT 'medium',
            status TEXT NOT NULL DEFAULT 'reported',
            photos TEXT,
            resolution_notes TEXT,
            reported_at TEXT NOT NULL,
            acknowledged_at TEXT,
            assigned_at TEXT,
            resolved_at TEXT,
            closed_at TEXT,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS inspections (
            id TEXT PRIMARY KEY,
            amenity_id TEXT NOT NULL REFERENCES station_amenities(id) ON DELETE CASCADE,
            station_id TEXT NOT NULL,
            inspector_id TEXT REFERENCES users(id) ON DELETE SET NULL,
            status TEXT NOT NULL,
            notes TEXT,
            photos TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            id TEXT PRIMARY KEY,
            station_id TEXT,
            period TEXT NOT NULL,
            start_date TEXT NOT NULL,
            generated_by TEXT,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_users_station ON users(station_id);
        CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
        CREATE INDEX IF NOT EXISTS idx_amenities_station ON station_amenities(station_id);
        CREATE INDEX IF NOT EXISTS idx_amenities_type ON station_amenities(amenity_type_id);
        CREATE INDEX IF NOT EXISTS idx_issues_station_reported ON issues(station_id, reported_at);
        CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status);
        CREATE INDEX IF NOT EXISTS idx_inspections_station_created ON inspections(station_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_inspections_amenity ON inspections(amenity_id);
        CREATE INDEX IF NOT EXISTS idx_reports_station ON reports(station_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert the default amenity catalog; existing keys are left untouched.
async fn seed_amenity_types(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let now = timestamp(&Utc::now());
    for (key, label) in DEFAULT_AMENITY_TYPES {
        sqlx::query(
            "INSERT OR IGNORE INTO amenity_types (id, key, label, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(key)
        .bind(label)
        .bind(&now)
        .execute(pool)
        .await?;
    }
    Ok(())
}
