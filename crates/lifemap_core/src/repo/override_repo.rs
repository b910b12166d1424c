//! Override cache repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist the store's manual override cache per owner across sessions.
//!
//! # Invariants
//! - Rows are keyed by `(owner_id, bubble_uuid)`; writes are upserts.
//! - Manual rows restore from `x`/`y`, ring-snapped rows from
//!   `ring`/`angle`, so the authoritative form survives the round trip.

use crate::db::DbError;
use crate::model::bubble::{BubbleId, Position};
use crate::store::OverrideEntry;
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const OVERRIDE_SELECT_SQL: &str = "SELECT
    bubble_uuid,
    ring,
    angle,
    x,
    y,
    manual
FROM layout_overrides";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for override persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted override data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for the per-owner override cache.
pub trait OverrideRepository {
    fn load_overrides(&self, owner: &str) -> RepoResult<Vec<(BubbleId, OverrideEntry)>>;
    fn upsert_override(&self, owner: &str, id: BubbleId, entry: &OverrideEntry) -> RepoResult<()>;
    /// Returns whether a row was deleted.
    fn delete_override(&self, owner: &str, id: BubbleId) -> RepoResult<bool>;
    /// Atomically replaces every row of `owner` with `entries`.
    fn replace_overrides(&self, owner: &str, entries: &[(BubbleId, OverrideEntry)]) -> RepoResult<()>;
    /// Returns the number of deleted rows.
    fn clear_owner(&self, owner: &str) -> RepoResult<usize>;
}

/// SQLite-backed override repository.
pub struct SqliteOverrideRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOverrideRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl OverrideRepository for SqliteOverrideRepository<'_> {
    fn load_overrides(&self, owner: &str) -> RepoResult<Vec<(BubbleId, OverrideEntry)>> {
        let mut stmt = self.conn.prepare(&format!(
            "{OVERRIDE_SELECT_SQL}
             WHERE owner_id = ?1
             ORDER BY bubble_uuid ASC;"
        ))?;
        let mut rows = stmt.query([owner])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_override_row(row)?);
        }
        Ok(entries)
    }

    fn upsert_override(&self, owner: &str, id: BubbleId, entry: &OverrideEntry) -> RepoResult<()> {
        write_override(self.conn, owner, id, entry)
    }

    fn delete_override(&self, owner: &str, id: BubbleId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM layout_overrides WHERE owner_id = ?1 AND bubble_uuid = ?2;",
            params![owner, id.to_string()],
        )?;
        Ok(changed > 0)
    }

    fn replace_overrides(&self, owner: &str, entries: &[(BubbleId, OverrideEntry)]) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM layout_overrides WHERE owner_id = ?1;", [owner])?;
        for (id, entry) in entries {
            write_override(&tx, owner, *id, entry)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn clear_owner(&self, owner: &str) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM layout_overrides WHERE owner_id = ?1;", [owner])?;
        Ok(changed)
    }
}

fn write_override(conn: &Connection, owner: &str, id: BubbleId, entry: &OverrideEntry) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO layout_overrides (
            owner_id,
            bubble_uuid,
            ring,
            angle,
            x,
            y,
            manual
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(owner_id, bubble_uuid) DO UPDATE SET
            ring = excluded.ring,
            angle = excluded.angle,
            x = excluded.x,
            y = excluded.y,
            manual = excluded.manual,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![
            owner,
            id.to_string(),
            entry.position.ring(),
            entry.position.angle(),
            entry.position.x(),
            entry.position.y(),
            bool_to_int(entry.manual),
        ],
    )?;
    Ok(())
}

fn parse_override_row(row: &Row<'_>) -> RepoResult<(BubbleId, OverrideEntry)> {
    let uuid_text: String = row.get("bubble_uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid value `{uuid_text}` in layout_overrides.bubble_uuid"
        ))
    })?;

    let manual = match row.get::<_, i64>("manual")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid manual value `{other}` in layout_overrides.manual"
            )));
        }
    };

    let ring: f64 = row.get("ring")?;
    let angle: f64 = row.get("angle")?;
    let x: f64 = row.get("x")?;
    let y: f64 = row.get("y")?;
    let position = if manual {
        Position::from_normalized(x, y)
    } else if ring.is_finite() && angle.is_finite() {
        Some(Position::from_polar(ring, angle))
    } else {
        None
    };
    let position = position.ok_or_else(|| {
        RepoError::InvalidData(format!("unresolvable position for bubble {uuid_text}"))
    })?;

    Ok((id, OverrideEntry { position, manual }))
}

fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}
