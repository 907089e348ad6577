//! SQLite-backed record store.
//!
//! Explicit schema and SQL stand in for the reference behavior's declarative
//! entity mapping. Surrogate keys come from SQLite's rowid; referential
//! integrity is enforced with `foreign_keys` on, so an email referencing a
//! missing employee fails with a constraint error instead of persisting.

use crate::error::StorageError;
use crate::model::{Email, Employee, NewEmail, NewEmployee};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

const SCHEMA: &str = "\
PRAGMA foreign_keys = ON;
CREATE TABLE IF NOT EXISTS EMPLOYEE (
    ID         INTEGER PRIMARY KEY AUTOINCREMENT,
    FIRST_NAME TEXT NOT NULL,
    LAST_NAME  TEXT NOT NULL,
    SALARY     REAL NOT NULL
);
CREATE TABLE IF NOT EXISTS EMAIL (
    ID          INTEGER PRIMARY KEY AUTOINCREMENT,
    ADDRESS     TEXT NOT NULL,
    ID_EMPLOYEE INTEGER NOT NULL REFERENCES EMPLOYEE(ID)
);
";

/// Create/insert access to the `EMPLOYEE` / `EMAIL` table pair.
pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Open (creating if necessary) the database at `path` and apply the
    /// schema. `:memory:` is accepted.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open a private in-memory database. Used by tests; the rows vanish with
    /// the store.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(|source| StorageError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA).map_err(StorageError::Schema)?;
        Ok(Self { conn })
    }

    /// Persist an employee and return it with its assigned id.
    pub fn insert_employee(&self, record: &NewEmployee) -> Result<Employee, StorageError> {
        self.conn
            .execute(
                "INSERT INTO EMPLOYEE (FIRST_NAME, LAST_NAME, SALARY) VALUES (?1, ?2, ?3)",
                params![record.first_name, record.last_name, record.salary],
            )
            .map_err(|source| classify("employee", source))?;
        Ok(Employee {
            id: self.conn.last_insert_rowid(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            salary: record.salary,
        })
    }

    /// Persist an email and return it with its assigned id. The referenced
    /// employee must already exist.
    pub fn insert_email(&self, record: &NewEmail) -> Result<Email, StorageError> {
        self.conn
            .execute(
                "INSERT INTO EMAIL (ADDRESS, ID_EMPLOYEE) VALUES (?1, ?2)",
                params![record.address, record.employee_id],
            )
            .map_err(|source| classify("email", source))?;
        Ok(Email {
            id: self.conn.last_insert_rowid(),
            address: record.address.clone(),
            employee_id: record.employee_id,
        })
    }

    /// The live connection, for the fill step's read queries.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn employee_count(&self) -> Result<i64, StorageError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM EMPLOYEE", [], |row| row.get(0))
            .map_err(StorageError::Query)
    }

    pub fn email_count(&self) -> Result<i64, StorageError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM EMAIL", [], |row| row.get(0))
            .map_err(StorageError::Query)
    }
}

fn classify(entity: &'static str, source: rusqlite::Error) -> StorageError {
    match &source {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StorageError::Constraint { entity, source }
        }
        _ => StorageError::Save { entity, source },
    }
}
