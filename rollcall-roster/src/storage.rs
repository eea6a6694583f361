//! SQLite-backed roster and attendance store

use parking_lot::Mutex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

/// A class
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Class {
    pub id: i64,
    pub name: String,
}

/// A student enrolled in one class
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Student {
    pub id: i64,
    pub full_name: String,
    pub class_id: i64,
}

/// One attendance entry as submitted by a client.
///
/// Fields are loosely typed so that whatever the client sent is handed to the
/// store as-is; the table constraints decide what is acceptable.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRecord {
    pub student_id: SqlValue,
    pub class_id: SqlValue,
    pub status: SqlValue,
    pub date_recorded: SqlValue,
}

/// A stored attendance row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRow {
    pub student_id: i64,
    pub class_id: i64,
    pub status: String,
    pub date_recorded: String,
    pub synced: bool,
}

/// How a batch of attendance records is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Plain insert; a natural-key collision fails the batch
    Submit,
    /// Insert or overwrite on the natural key, marking rows as synced
    Sync,
}

impl WriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Sync => "sync",
        }
    }

    fn statement(&self) -> &'static str {
        match self {
            Self::Submit => {
                "INSERT INTO attendance_records(student_id, class_id, status, date_recorded)
                 VALUES(?1, ?2, ?3, ?4)"
            }
            Self::Sync => {
                "INSERT INTO attendance_records(student_id, class_id, status, date_recorded, synced)
                 VALUES(?1, ?2, ?3, ?4, 1)
                 ON CONFLICT(student_id, class_id, date_recorded) DO UPDATE SET
                   status = excluded.status,
                   date_recorded = excluded.date_recorded,
                   synced = excluded.synced"
            }
        }
    }
}

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("record {index}: {source}")]
    Record {
        index: usize,
        #[source]
        source: rusqlite::Error,
    },
}

/// Single-connection store shared by all requests. Callers take turns on the
/// connection; nothing is cached between calls.
pub struct RosterStore {
    conn: Mutex<Connection>,
}

impl RosterStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create the tables if they do not exist yet. Intended for local
    /// development databases and tests; existing tables are left untouched.
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS classes(
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS students(
                id INTEGER PRIMARY KEY,
                full_name TEXT NOT NULL,
                class_id INTEGER NOT NULL,
                FOREIGN KEY(class_id) REFERENCES classes(id)
            );
            CREATE INDEX IF NOT EXISTS idx_students_class ON students(class_id);
            CREATE TABLE IF NOT EXISTS attendance_records(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id INTEGER NOT NULL,
                class_id INTEGER NOT NULL,
                status TEXT NOT NULL,
                date_recorded TEXT NOT NULL,
                synced INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY(student_id) REFERENCES students(id),
                FOREIGN KEY(class_id) REFERENCES classes(id),
                UNIQUE(student_id, class_id, date_recorded)
            );",
        )?;
        Ok(())
    }

    pub fn list_classes(&self) -> Result<Vec<Class>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id, name FROM classes ORDER BY name")?;
        let rows = stmt
            .query_map([], class_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Look up a class by the raw id segment from the request path.
    pub fn get_class(&self, id: &str) -> Result<Option<Class>, StoreError> {
        let conn = self.conn.lock();
        let class = conn
            .query_row(
                "SELECT id, name FROM classes WHERE id = ?",
                [id],
                class_from_row,
            )
            .optional()?;
        Ok(class)
    }

    pub fn list_class_students(&self, class_id: &str) -> Result<Vec<Student>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, full_name, class_id FROM students WHERE class_id = ? ORDER BY full_name",
        )?;
        let rows = stmt
            .query_map([class_id], student_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT id, full_name, class_id FROM students ORDER BY full_name")?;
        let rows = stmt
            .query_map([], student_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_student(&self, id: &str) -> Result<Option<Student>, StoreError> {
        let conn = self.conn.lock();
        let student = conn
            .query_row(
                "SELECT id, full_name, class_id FROM students WHERE id = ?",
                [id],
                student_from_row,
            )
            .optional()?;
        Ok(student)
    }

    /// Write a batch in one transaction. Either every record is applied or,
    /// on the first failure, the transaction is rolled back and nothing is.
    pub fn write_attendance(
        &self,
        mode: WriteMode,
        records: &[AttendanceRecord],
    ) -> Result<usize, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let written = apply_records(&tx, mode, records);
        match written {
            Ok(count) => {
                tx.commit()?;
                debug!(mode = mode.as_str(), count, "Attendance batch committed");
                Ok(count)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(error = %rollback_err, "Attendance rollback failed");
                }
                Err(e)
            }
        }
    }

    /// All attendance rows, ordered by natural key.
    pub fn list_attendance(&self) -> Result<Vec<AttendanceRow>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT student_id, class_id, status, date_recorded, synced
             FROM attendance_records
             ORDER BY student_id, class_id, date_recorded",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(AttendanceRow {
                    student_id: row.get(0)?,
                    class_id: row.get(1)?,
                    status: row.get(2)?,
                    date_recorded: row.get(3)?,
                    synced: row.get::<_, i64>(4)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Seed a class row. The HTTP API never writes classes.
    pub fn insert_class(&self, id: i64, name: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute("INSERT INTO classes(id, name) VALUES(?, ?)", params![id, name])?;
        Ok(())
    }

    pub fn insert_student(&self, id: i64, full_name: &str, class_id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO students(id, full_name, class_id) VALUES(?, ?, ?)",
            params![id, full_name, class_id],
        )?;
        Ok(())
    }
}

fn apply_records(
    conn: &Connection,
    mode: WriteMode,
    records: &[AttendanceRecord],
) -> Result<usize, StoreError> {
    let mut stmt = conn.prepare(mode.statement())?;
    for (index, record) in records.iter().enumerate() {
        stmt.execute(params![
            record.student_id,
            record.class_id,
            record.status,
            record.date_recorded,
        ])
        .map_err(|source| StoreError::Record { index, source })?;
    }
    Ok(records.len())
}

fn class_from_row(row: &Row<'_>) -> rusqlite::Result<Class> {
    Ok(Class {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        full_name: row.get(1)?,
        class_id: row.get(2)?,
    })
}
