//! Database schema migrations for petcare.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 3;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!("failed to read schema_version: {e}");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: bookings, availability and reviews.
///
/// `bookings.seq` records insertion order; listings sort on it.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS bookings (
            seq           INTEGER PRIMARY KEY AUTOINCREMENT,
            id            TEXT NOT NULL UNIQUE,
            owner_id      TEXT NOT NULL,
            sitter_id     TEXT NOT NULL,
            pet_id        TEXT NOT NULL,
            service_type  TEXT NOT NULL,
            start_date    TEXT NOT NULL,
            end_date      TEXT NOT NULL,
            status        TEXT NOT NULL,
            price         REAL NOT NULL,
            notes         TEXT,
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS weekly_rules (
            sitter_id     TEXT NOT NULL,
            day_of_week   TEXT NOT NULL,
            start_time    TEXT NOT NULL,
            end_time      TEXT NOT NULL,
            is_available  INTEGER NOT NULL,
            PRIMARY KEY (sitter_id, day_of_week)
        );

        CREATE TABLE IF NOT EXISTS date_overrides (
            sitter_id     TEXT NOT NULL,
            date          TEXT NOT NULL,
            is_available  INTEGER NOT NULL,
            start_time    TEXT,
            end_time      TEXT,
            PRIMARY KEY (sitter_id, date)
        );

        CREATE TABLE IF NOT EXISTS sitter_settings (
            sitter_id          TEXT PRIMARY KEY,
            utc_offset_minutes INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS reviews (
            seq           INTEGER PRIMARY KEY AUTOINCREMENT,
            id            TEXT NOT NULL UNIQUE,
            booking_id    TEXT NOT NULL UNIQUE,
            owner_id      TEXT NOT NULL,
            sitter_id     TEXT NOT NULL,
            rating        INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
            comment       TEXT NOT NULL DEFAULT '',
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        );",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: indexes for the per-party listing queries.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_bookings_sitter_status ON bookings(sitter_id, status);
         CREATE INDEX IF NOT EXISTS idx_bookings_owner_status ON bookings(owner_id, status);
         CREATE INDEX IF NOT EXISTS idx_reviews_sitter ON reviews(sitter_id);",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}

/// Migration v3: per-booking message threads.
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS messages (
            seq           INTEGER PRIMARY KEY AUTOINCREMENT,
            id            TEXT NOT NULL UNIQUE,
            booking_id    TEXT NOT NULL,
            sender_id     TEXT NOT NULL,
            sender_role   TEXT NOT NULL,
            content       TEXT NOT NULL,
            created_at    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_messages_booking ON messages(booking_id);",
    )?;
    set_schema_version(&tx, 3)?;
    tx.commit()
}
