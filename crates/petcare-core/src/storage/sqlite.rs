//! SQLite-backed [`Store`].

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{data_dir, migrations, Config, Store};
use crate::availability::{ClockTime, DateOverride, SitterAvailability, WeeklyRule};
use crate::booking::{Booking, BookingStatus};
use crate::error::{CoreError, DatabaseError, Result};
use crate::message::Message;
use crate::review::Review;

const BOOKING_COLUMNS: &str = "id, owner_id, sitter_id, pet_id, service_type, start_date, end_date,
     status, price, notes, created_at, updated_at";

const REVIEW_COLUMNS: &str =
    "id, booking_id, owner_id, sitter_id, rating, comment, created_at, updated_at";

const MESSAGE_COLUMNS: &str = "id, booking_id, sender_id, sender_role, content, created_at";

/// SQLite database for bookings, availability, reviews and messages.
///
/// The connection is shared behind a mutex; each trait method runs as one
/// statement or one transaction.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and bring its schema up to date.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Self::from_connection(conn)
    }

    /// Open the database named in `config` inside the data directory.
    pub fn open_default(config: &Config) -> Result<Self> {
        let path = data_dir()?.join(&config.storage.database_file);
        Self::open(&path)
    }

    /// Open an in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn list_bookings_where(
        &self,
        column: &str,
        value: &str,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>> {
        let conn = self.conn.lock()?;
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE {column} = ?1 AND (?2 IS NULL OR status = ?2)
             ORDER BY seq"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![value, status.map(|s| s.as_str())], row_to_booking)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

// === Helper Functions ===

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_column<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = CoreError>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

fn parse_optional_time(row: &Row, idx: usize) -> rusqlite::Result<Option<ClockTime>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| s.parse().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn parse_datetime(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parse_date(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| conversion_error(idx, e))
}

fn row_to_booking(row: &Row) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        sitter_id: row.get(2)?,
        pet_id: row.get(3)?,
        service_type: parse_column(row, 4)?,
        start_date: parse_datetime(row, 5)?,
        end_date: parse_datetime(row, 6)?,
        status: parse_column(row, 7)?,
        price: row.get(8)?,
        notes: row.get(9)?,
        created_at: parse_datetime(row, 10)?,
        updated_at: parse_datetime(row, 11)?,
    })
}

fn row_to_review(row: &Row) -> rusqlite::Result<Review> {
    Ok(Review {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        owner_id: row.get(2)?,
        sitter_id: row.get(3)?,
        rating: row.get(4)?,
        comment: row.get(5)?,
        created_at: parse_datetime(row, 6)?,
        updated_at: parse_datetime(row, 7)?,
    })
}

fn row_to_message(row: &Row) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        sender_id: row.get(2)?,
        sender_role: parse_column(row, 3)?,
        content: row.get(4)?,
        created_at: parse_datetime(row, 5)?,
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn upsert_weekly_rule(conn: &Connection, rule: &WeeklyRule) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO weekly_rules (sitter_id, day_of_week, start_time, end_time, is_available)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (sitter_id, day_of_week) DO UPDATE SET
             start_time = excluded.start_time,
             end_time = excluded.end_time,
             is_available = excluded.is_available",
        params![
            rule.sitter_id,
            rule.day_of_week.as_str(),
            rule.start_time.to_string(),
            rule.end_time.to_string(),
            rule.is_available,
        ],
    )?;
    Ok(())
}

impl Store for SqliteStore {
    fn get_booking(&self, id: &str) -> Result<Option<Booking>> {
        let conn = self.conn.lock()?;
        let booking = conn
            .query_row(
                &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
                params![id],
                row_to_booking,
            )
            .optional()?;
        Ok(booking)
    }

    fn save_booking(&self, booking: &Booking, expected: Option<BookingStatus>) -> Result<bool> {
        let conn = self.conn.lock()?;
        match expected {
            None => {
                // Timestamps share one fixed-width UTC format, so text order is time order.
                let inserted = conn.execute(
                    "INSERT INTO bookings (id, owner_id, sitter_id, pet_id, service_type, start_date,
                         end_date, status, price, notes, created_at, updated_at)
                     SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12
                     WHERE ?8 NOT IN ('pending', 'accepted')
                        OR NOT EXISTS (
                            SELECT 1 FROM bookings
                            WHERE sitter_id = ?3
                              AND status IN ('pending', 'accepted')
                              AND start_date < ?7
                              AND end_date > ?6
                        )",
                    params![
                        booking.id,
                        booking.owner_id,
                        booking.sitter_id,
                        booking.pet_id,
                        booking.service_type.as_str(),
                        format_datetime(&booking.start_date),
                        format_datetime(&booking.end_date),
                        booking.status.as_str(),
                        booking.price,
                        booking.notes,
                        format_datetime(&booking.created_at),
                        format_datetime(&booking.updated_at),
                    ],
                );
                match inserted {
                    Ok(rows) => Ok(rows == 1),
                    Err(e) if is_constraint_violation(&e) => {
                        Err(CoreError::Duplicate(format!("booking {}", booking.id)))
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Some(expected) => {
                let changed = conn.execute(
                    "UPDATE bookings SET status = ?2, notes = ?3, updated_at = ?4
                     WHERE id = ?1 AND status = ?5",
                    params![
                        booking.id,
                        booking.status.as_str(),
                        booking.notes,
                        format_datetime(&booking.updated_at),
                        expected.as_str(),
                    ],
                )?;
                Ok(changed == 1)
            }
        }
    }

    fn list_bookings_by_sitter(
        &self,
        sitter_id: &str,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>> {
        self.list_bookings_where("sitter_id", sitter_id, status)
    }

    fn list_bookings_by_owner(
        &self,
        owner_id: &str,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>> {
        self.list_bookings_where("owner_id", owner_id, status)
    }

    fn get_availability(&self, sitter_id: &str) -> Result<SitterAvailability> {
        let conn = self.conn.lock()?;
        let mut availability = SitterAvailability::empty(sitter_id);

        availability.utc_offset_minutes = conn
            .query_row(
                "SELECT utc_offset_minutes FROM sitter_settings WHERE sitter_id = ?1",
                params![sitter_id],
                |row| row.get(0),
            )
            .optional()?;

        let mut stmt = conn.prepare(
            "SELECT sitter_id, day_of_week, start_time, end_time, is_available
             FROM weekly_rules WHERE sitter_id = ?1",
        )?;
        let rules = stmt.query_map(params![sitter_id], |row| {
            Ok(WeeklyRule {
                sitter_id: row.get(0)?,
                day_of_week: parse_column(row, 1)?,
                start_time: parse_column(row, 2)?,
                end_time: parse_column(row, 3)?,
                is_available: row.get(4)?,
            })
        })?;
        for rule in rules {
            availability.put_weekly(rule?);
        }

        let mut stmt = conn.prepare(
            "SELECT sitter_id, date, is_available, start_time, end_time
             FROM date_overrides WHERE sitter_id = ?1",
        )?;
        let overrides = stmt.query_map(params![sitter_id], |row| {
            Ok(DateOverride {
                sitter_id: row.get(0)?,
                date: parse_date(row, 1)?,
                is_available: row.get(2)?,
                start_time: parse_optional_time(row, 3)?,
                end_time: parse_optional_time(row, 4)?,
            })
        })?;
        for date_override in overrides {
            availability.put_override(date_override?);
        }

        Ok(availability)
    }

    fn save_weekly_rule(&self, rule: &WeeklyRule) -> Result<()> {
        let conn = self.conn.lock()?;
        upsert_weekly_rule(&conn, rule)?;
        Ok(())
    }

    fn save_weekly_rules(&self, rules: &[WeeklyRule]) -> Result<()> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;
        for rule in rules {
            upsert_weekly_rule(&tx, rule)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn save_date_override(&self, date_override: &DateOverride) -> Result<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO date_overrides (sitter_id, date, is_available, start_time, end_time)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (sitter_id, date) DO UPDATE SET
                 is_available = excluded.is_available,
                 start_time = excluded.start_time,
                 end_time = excluded.end_time",
            params![
                date_override.sitter_id,
                date_override.date.format("%Y-%m-%d").to_string(),
                date_override.is_available,
                date_override.start_time.map(|t| t.to_string()),
                date_override.end_time.map(|t| t.to_string()),
            ],
        )?;
        Ok(())
    }

    fn set_utc_offset(&self, sitter_id: &str, minutes: i32) -> Result<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO sitter_settings (sitter_id, utc_offset_minutes) VALUES (?1, ?2)
             ON CONFLICT (sitter_id) DO UPDATE SET utc_offset_minutes = excluded.utc_offset_minutes",
            params![sitter_id, minutes],
        )?;
        Ok(())
    }

    fn get_review(&self, id: &str) -> Result<Option<Review>> {
        let conn = self.conn.lock()?;
        let review = conn
            .query_row(
                &format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = ?1"),
                params![id],
                row_to_review,
            )
            .optional()?;
        Ok(review)
    }

    fn get_review_by_booking(&self, booking_id: &str) -> Result<Option<Review>> {
        let conn = self.conn.lock()?;
        let review = conn
            .query_row(
                &format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE booking_id = ?1"),
                params![booking_id],
                row_to_review,
            )
            .optional()?;
        Ok(review)
    }

    fn save_review(&self, review: &Review) -> Result<bool> {
        let conn = self.conn.lock()?;
        let inserted = conn.execute(
            "INSERT INTO reviews (id, booking_id, owner_id, sitter_id, rating, comment, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                review.id,
                review.booking_id,
                review.owner_id,
                review.sitter_id,
                review.rating,
                review.comment,
                format_datetime(&review.created_at),
                format_datetime(&review.updated_at),
            ],
        );
        match inserted {
            Ok(_) => Ok(true),
            Err(e) if is_constraint_violation(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn update_review(&self, review: &Review) -> Result<()> {
        let conn = self.conn.lock()?;
        let changed = conn.execute(
            "UPDATE reviews SET rating = ?2, comment = ?3, updated_at = ?4 WHERE id = ?1",
            params![
                review.id,
                review.rating,
                review.comment,
                format_datetime(&review.updated_at),
            ],
        )?;
        if changed == 0 {
            return Err(CoreError::not_found(format!("review {}", review.id)));
        }
        Ok(())
    }

    fn delete_review(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock()?;
        conn.execute("DELETE FROM reviews WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn list_reviews_by_sitter(&self, sitter_id: &str) -> Result<Vec<Review>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE sitter_id = ?1 ORDER BY seq"
        ))?;
        let rows = stmt.query_map(params![sitter_id], row_to_review)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn save_message(&self, message: &Message) -> Result<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            &format!("INSERT INTO messages ({MESSAGE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
            params![
                message.id,
                message.booking_id,
                message.sender_id,
                message.sender_role.as_str(),
                message.content,
                format_datetime(&message.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_messages_by_booking(&self, booking_id: &str) -> Result<Vec<Message>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE booking_id = ?1 ORDER BY seq"
        ))?;
        let rows = stmt.query_map(params![booking_id], row_to_message)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
