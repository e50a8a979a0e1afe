//! SQLite-backed contact store.
//!
//! One `contact` table holds every row. Transactions are opened with
//! `BEGIN IMMEDIATE`, so a second writer (in this or another process) waits
//! for the first to finish instead of reading state that is about to change.

use std::path::Path;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};

use idr_types::{Contact, ContactId, Link, LinkPrecedence, NewContact};

use crate::error::{StoreError, StoreResult};
use crate::traits::{ContactStore, ContactTx};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS contact (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    email           TEXT,
    phone_number    TEXT,
    linked_id       INTEGER REFERENCES contact(id),
    link_precedence TEXT NOT NULL CHECK (link_precedence IN ('primary', 'secondary')),
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    deleted_at      TEXT
);
CREATE INDEX IF NOT EXISTS contact_email_idx ON contact(email);
CREATE INDEX IF NOT EXISTS contact_phone_number_idx ON contact(phone_number);
CREATE INDEX IF NOT EXISTS contact_linked_id_idx ON contact(linked_id);
";

const COLUMNS: &str =
    "id, email, phone_number, linked_id, link_precedence, created_at, updated_at, deleted_at";

/// How long to keep trying when the database is locked by another writer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt to begin a transaction.
    pub max_retries: u32,
    /// Sleep before retry `n` is `n * backoff`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff: Duration::from_millis(20),
        }
    }
}

/// Durable contact store backed by a single SQLite database.
pub struct SqliteContactStore {
    conn: Mutex<Connection>,
    retry: RetryPolicy,
}

impl SqliteContactStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        // Lock waits are handled by the retry loop in `transaction`.
        conn.busy_timeout(Duration::ZERO)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            retry: RetryPolicy::default(),
        })
    }

    /// Replace the retry policy used when the database is busy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

impl ContactStore for SqliteContactStore {
    fn transaction<T, E, F>(&self, mut f: F) -> Result<T, E>
    where
        F: FnMut(&mut dyn ContactTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("connection lock poisoned: {e}")))?;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let tx = match conn.transaction_with_behavior(TransactionBehavior::Immediate) {
                Ok(tx) => tx,
                Err(e) if is_busy(&e) && attempt <= self.retry.max_retries => {
                    tracing::warn!(attempt, "contact database busy, retrying transaction");
                    thread::sleep(self.retry.backoff * attempt);
                    continue;
                }
                Err(e) if is_busy(&e) => {
                    return Err(StoreError::Conflict { attempts: attempt }.into());
                }
                Err(e) => return Err(StoreError::from(e).into()),
            };

            // Dropping `tx` without commit rolls it back.
            let value = f(&mut SqliteTx { tx: &tx })?;
            return match tx.commit() {
                Ok(()) => Ok(value),
                Err(e) if is_busy(&e) => Err(StoreError::Conflict { attempts: attempt }.into()),
                Err(e) => Err(StoreError::from(e).into()),
            };
        }
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

impl std::fmt::Debug for SqliteContactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteContactStore")
            .field("retry", &self.retry)
            .finish()
    }
}

/// Raw column values, before the link columns are validated.
struct ContactRow {
    id: i64,
    email: Option<String>,
    phone_number: Option<String>,
    linked_id: Option<i64>,
    link_precedence: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl ContactRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            phone_number: row.get(2)?,
            linked_id: row.get(3)?,
            link_precedence: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            deleted_at: row.get(7)?,
        })
    }

    fn into_contact(self) -> StoreResult<Contact> {
        let id = ContactId::new(self.id as u64);
        let precedence: LinkPrecedence = self
            .link_precedence
            .parse()
            .map_err(|e| StoreError::corrupt(id, e))?;
        let linked = self.linked_id.map(|raw| ContactId::new(raw as u64));
        let link = Link::from_parts(id, precedence, linked).map_err(|e| StoreError::corrupt(id, e))?;
        Ok(Contact {
            id,
            email: self.email,
            phone_number: self.phone_number,
            link,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

fn linked_column(link: &Link) -> Option<i64> {
    link.linked_id().map(|id| id.get() as i64)
}

struct SqliteTx<'a, 'c> {
    tx: &'a rusqlite::Transaction<'c>,
}

impl SqliteTx<'_, '_> {
    fn query(&self, sql: &str, params: impl rusqlite::Params) -> StoreResult<Vec<Contact>> {
        let mut stmt = self.tx.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params, ContactRow::read)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(ContactRow::into_contact).collect()
    }
}

impl ContactTx for SqliteTx<'_, '_> {
    fn find_by_email_or_phone(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> StoreResult<Vec<Contact>> {
        if email.is_none() && phone_number.is_none() {
            return Ok(Vec::new());
        }
        self.query(
            &format!(
                "SELECT {COLUMNS} FROM contact
                 WHERE (?1 IS NOT NULL AND email = ?1)
                    OR (?2 IS NOT NULL AND phone_number = ?2)
                 ORDER BY id"
            ),
            params![email, phone_number],
        )
    }

    fn find_by_id(&self, id: ContactId) -> StoreResult<Option<Contact>> {
        let mut stmt = self
            .tx
            .prepare_cached(&format!("SELECT {COLUMNS} FROM contact WHERE id = ?1"))?;
        let row = stmt
            .query_row(params![id.get() as i64], ContactRow::read)
            .optional()?;
        row.map(ContactRow::into_contact).transpose()
    }

    fn find_cluster(&self, primary: ContactId) -> StoreResult<Vec<Contact>> {
        self.query(
            &format!("SELECT {COLUMNS} FROM contact WHERE linked_id = ?1 ORDER BY id"),
            params![primary.get() as i64],
        )
    }

    fn all_contacts(&self) -> StoreResult<Vec<Contact>> {
        self.query(&format!("SELECT {COLUMNS} FROM contact ORDER BY id"), [])
    }

    fn insert(&mut self, contact: NewContact) -> StoreResult<Contact> {
        self.tx.execute(
            "INSERT INTO contact
                (email, phone_number, linked_id, link_precedence, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                contact.email,
                contact.phone_number,
                linked_column(&contact.link),
                contact.link.precedence().as_str(),
                contact.created_at,
            ],
        )?;
        let id = ContactId::new(self.tx.last_insert_rowid() as u64);
        Ok(contact.into_contact(id))
    }

    fn update(&mut self, contact: &Contact) -> StoreResult<Contact> {
        let changed = self.tx.execute(
            "UPDATE contact
                SET email = ?2, phone_number = ?3, linked_id = ?4, link_precedence = ?5,
                    updated_at = ?6, deleted_at = ?7
              WHERE id = ?1",
            params![
                contact.id.get() as i64,
                contact.email,
                contact.phone_number,
                linked_column(&contact.link),
                contact.link_precedence().as_str(),
                contact.updated_at,
                contact.deleted_at,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(contact.id));
        }
        self.find_by_id(contact.id)?
            .ok_or(StoreError::NotFound(contact.id))
    }

    fn contact_count(&self) -> StoreResult<u64> {
        let count: i64 = self
            .tx
            .query_row("SELECT COUNT(*) FROM contact", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
