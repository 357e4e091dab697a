//! Item repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/read/save/update/list over the `todo_items` table.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `Item::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - `list_items` returns rows in insertion (creation) order.
//! - `update_item` runs its read, callback and write inside one
//!   `BEGIN IMMEDIATE` transaction, so writers to the same database file
//!   (including other processes) are serialized and cannot lose updates.
//! - `save_item` is a blind overwrite and gives no such guarantee.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::item::{Item, ItemId, ItemValidationError};
use rusqlite::{params, Connection, ErrorCode, Row, Transaction, TransactionBehavior};
use thiserror::Error;
use uuid::Uuid;

const ITEM_TABLE: &str = "todo_items";
const ITEM_COLUMNS: &[&str] = &["uuid", "description", "created_at", "due_at", "done_at"];

const ITEM_SELECT_SQL: &str = "SELECT
    uuid,
    description,
    created_at,
    due_at,
    done_at
FROM todo_items";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for item persistence and query operations.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0}")]
    Validation(#[from] ItemValidationError),
    #[error("{0}")]
    Db(#[from] DbError),
    #[error("item not found: {0}")]
    NotFound(ItemId),
    #[error("item already exists: {0}")]
    Conflict(ItemId),
    #[error("invalid persisted item data: {0}")]
    InvalidData(String),
    #[error("connection schema version {actual_version} does not match expected {expected_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("required table `{0}` is missing")]
    MissingRequiredTable(&'static str),
    #[error("required column `{table}.{column}` is missing")]
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    #[error("item store lock poisoned")]
    LockPoisoned,
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable keyed storage for items.
///
/// `update_item` is the only read-modify-write entry point. Implementations
/// must run it atomically with respect to every other write on the same
/// identifier; the service relies on that and takes no locks of its own.
pub trait ItemRepository {
    /// Persists a new item. Fails with `Conflict` when the id exists.
    fn create_item(&self, item: &Item) -> RepoResult<()>;
    /// Point lookup; `Ok(None)` when absent.
    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>>;
    /// Overwrites `description` and `done_at`. Fails with `NotFound` when absent.
    fn save_item(&self, item: &Item) -> RepoResult<()>;
    /// Atomically loads an item, lets `apply` mutate it and persists the
    /// mutable fields.
    ///
    /// Returns `Ok(None)` without calling `apply` when the id is absent.
    /// When `apply` fails nothing is written and its error is returned.
    fn update_item<E, F>(&self, id: ItemId, apply: F) -> Result<Option<Item>, E>
    where
        E: From<RepoError>,
        F: FnOnce(&mut Item) -> Result<(), E>;
    /// Lists items in creation order, optionally only those without `done_at`.
    fn list_items(&self, not_done_only: bool) -> RepoResult<Vec<Item>>;
}

impl<R: ItemRepository + ?Sized> ItemRepository for &R {
    fn create_item(&self, item: &Item) -> RepoResult<()> {
        (**self).create_item(item)
    }

    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>> {
        (**self).get_item(id)
    }

    fn save_item(&self, item: &Item) -> RepoResult<()> {
        (**self).save_item(item)
    }

    fn update_item<E, F>(&self, id: ItemId, apply: F) -> Result<Option<Item>, E>
    where
        E: From<RepoError>,
        F: FnOnce(&mut Item) -> Result<(), E>,
    {
        (**self).update_item(id, apply)
    }

    fn list_items(&self, not_done_only: bool) -> RepoResult<Vec<Item>> {
        (**self).list_items(not_done_only)
    }
}

/// SQLite-backed item repository.
pub struct SqliteItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemRepository<'conn> {
    /// Wraps a connection after checking that migrations were applied.
    ///
    /// Use `db::open_db` / `db::open_db_in_memory` to obtain a ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version = current_user_version(conn)?;
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }

        ensure_schema(conn)?;
        Ok(Self { conn })
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn create_item(&self, item: &Item) -> RepoResult<()> {
        item.validate()?;

        let result = self.conn.execute(
            "INSERT INTO todo_items (
                uuid,
                description,
                created_at,
                due_at,
                done_at
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                item.uuid.to_string(),
                item.description.as_str(),
                item.created_at,
                item.due_at,
                item.done_at,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_primary_key_violation(&err) => Err(RepoError::Conflict(item.uuid)),
            Err(err) => Err(err.into()),
        }
    }

    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>> {
        select_item(self.conn, id)
    }

    fn save_item(&self, item: &Item) -> RepoResult<()> {
        write_mutable_fields(self.conn, item)
    }

    fn update_item<E, F>(&self, id: ItemId, apply: F) -> Result<Option<Item>, E>
    where
        E: From<RepoError>,
        F: FnOnce(&mut Item) -> Result<(), E>,
    {
        // IMMEDIATE takes the write lock before the read, so no other writer
        // can commit between our SELECT and UPDATE. Dropping `tx` rolls back.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;

        let Some(mut item) = select_item(&tx, id)? else {
            return Ok(None);
        };
        apply(&mut item)?;
        write_mutable_fields(&tx, &item)?;
        tx.commit().map_err(RepoError::from)?;

        Ok(Some(item))
    }

    fn list_items(&self, not_done_only: bool) -> RepoResult<Vec<Item>> {
        let mut sql = format!("{ITEM_SELECT_SQL} WHERE 1 = 1");
        if not_done_only {
            sql.push_str(" AND done_at IS NULL");
        }
        // rowid grows with each insert and rows are never deleted.
        sql.push_str(" ORDER BY rowid ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();

        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }

        Ok(items)
    }
}

fn select_item(conn: &Connection, id: ItemId) -> RepoResult<Option<Item>> {
    let mut stmt = conn.prepare(&format!("{ITEM_SELECT_SQL} WHERE uuid = ?1;"))?;

    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_item_row(row)?));
    }

    Ok(None)
}

fn write_mutable_fields(conn: &Connection, item: &Item) -> RepoResult<()> {
    item.validate()?;

    let changed = conn.execute(
        "UPDATE todo_items
         SET
            description = ?1,
            done_at = ?2
         WHERE uuid = ?3;",
        params![item.description.as_str(), item.done_at, item.uuid.to_string()],
    )?;

    if changed == 0 {
        return Err(RepoError::NotFound(item.uuid));
    }

    Ok(())
}

fn ensure_schema(conn: &Connection) -> RepoResult<()> {
    let table_exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
        );",
        [ITEM_TABLE],
        |row| row.get(0),
    )?;
    if table_exists == 0 {
        return Err(RepoError::MissingRequiredTable(ITEM_TABLE));
    }

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({ITEM_TABLE});"))?;
    let present = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<Result<Vec<_>, _>>()?;

    for &column in ITEM_COLUMNS {
        if !present.iter().any(|name| name == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: ITEM_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn is_primary_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<Item> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in todo_items.uuid"))
    })?;

    let item = Item {
        uuid,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
        due_at: row.get("due_at")?,
        done_at: row.get("done_at")?,
    };
    item.validate()?;
    Ok(item)
}
