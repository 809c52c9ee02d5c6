//! SQLite persistence for students, catalog and study groups.
//!
//! All access goes through [`SqliteRepository::read`] or
//! [`SqliteRepository::write`], which hand the caller a [`Tx`] bound to a
//! single SQLite transaction. The transaction commits once when the
//! closure returns `Ok` and rolls back (on drop) when it returns `Err`.
//!
//! # Concurrency
//!
//! The connection sits behind a `Mutex`, and writes open the transaction
//! with `BEGIN IMMEDIATE`. A check-then-act sequence such as "is there a
//! free slot? then insert a member" therefore runs with the database write
//! lock held, so two concurrent joins cannot both see the last slot.
//!
//! # Schema Versioning
//!
//! The schema version lives in SQLite's `user_version` pragma. To change
//! the schema, increment `SCHEMA_VERSION` and add a `migrate_v{N}_to_v{N+1}`
//! step to `run_migrations`.

mod catalog;
mod groups;
mod students;


use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, warn};

pub use catalog::{CourseRecord, SemesterRecord};
pub use groups::{PendingRequestRecord, StudentRequestRecord};
pub use students::{SessionRecord, StudentRecord};

/// Current schema version. Increment when making schema changes.
const SCHEMA_VERSION: i32 = 1;

/// Failure of the store itself, as opposed to a business-rule violation.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("storage error during {operation}: {detail}")]
    Storage {
        operation: &'static str,
        detail: String,
    },
    #[error("corrupt {what} in database")]
    Corruption { what: &'static str },
}

impl RepositoryError {
    pub fn storage(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::Storage {
            operation,
            detail: detail.into(),
        }
    }

    pub fn corruption(what: &'static str) -> Self {
        Self::Corruption { what }
    }
}

/// Adapter for `map_err` on rusqlite results.
pub(crate) fn storage_err(operation: &'static str) -> impl Fn(rusqlite::Error) -> RepositoryError {
    move |e| RepositoryError::storage(operation, e.to_string())
}

/// RFC 3339 text for a timestamp column. Fixed-width nanoseconds keep the
/// text order equal to the time order.
pub(crate) fn timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Handle on one open transaction.
///
/// Query and command methods are spread over the `students`, `catalog`
/// and `groups` submodules.
pub struct Tx<'conn> {
    inner: Transaction<'conn>,
}

impl<'conn> Tx<'conn> {
    fn conn(&self) -> &Connection {
        &self.inner
    }
}

/// SQLite-backed repository.
///
/// Uses `tokio::task::spawn_blocking` to run synchronous rusqlite calls
/// without blocking the async runtime.
pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRepository {
    /// Open (or create) the database at `path` and bring its schema up to date.
    ///
    /// # Durability
    ///
    /// - `journal_mode = WAL` (in-memory databases report `memory`)
    /// - `synchronous = FULL`
    /// - `busy_timeout = 5000ms`
    /// - `foreign_keys = ON`, which the cascade deletes rely on
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy();
        let is_in_memory = path_str == ":memory:";

        if !is_in_memory {
            if let Some(parent) = path_ref.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        RepositoryError::storage(
                            "create database directory",
                            format!("{}: {}", parent.display(), e),
                        )
                    })?;
                }
            }
        }

        let conn = Connection::open(path_ref).map_err(storage_err("open database"))?;

        // Sessions and password hashes live here.
        #[cfg(unix)]
        if !is_in_memory {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            if let Err(e) = std::fs::set_permissions(path_ref, permissions) {
                warn!("Failed to set restrictive permissions on database file: {}", e);
            }
        }

        Self::configure(&conn, is_in_memory)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory repository (for tests and ephemeral runs).
    pub fn new_in_memory() -> Result<Self, RepositoryError> {
        Self::new(":memory:")
    }

    fn configure(conn: &Connection, is_in_memory: bool) -> Result<(), RepositoryError> {
        // SQLite silently keeps DELETE mode on filesystems without shared
        // memory support, so check what we actually got.
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(storage_err("set journal_mode"))?;

        let journal_mode_ok = journal_mode.eq_ignore_ascii_case("wal")
            || (is_in_memory && journal_mode.eq_ignore_ascii_case("memory"));
        if !journal_mode_ok {
            return Err(RepositoryError::storage(
                "configure journal_mode",
                format!(
                    "Failed to enable WAL mode: SQLite returned '{}' instead of 'wal'",
                    journal_mode
                ),
            ));
        }

        conn.execute_batch(
            r#"
            PRAGMA synchronous = FULL;
            PRAGMA busy_timeout = 5000;
            PRAGMA foreign_keys = ON;
            "#,
        )
        .map_err(storage_err("configure pragmas"))
    }

    fn init_schema(conn: &Connection) -> Result<(), RepositoryError> {
        let current_version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .map_err(storage_err("read schema version"))?;

        if current_version > SCHEMA_VERSION {
            return Err(RepositoryError::storage(
                "schema version",
                format!(
                    "Database schema version {} is newer than supported version {}. \
                     Please upgrade the application.",
                    current_version, SCHEMA_VERSION
                ),
            ));
        }

        if current_version < SCHEMA_VERSION {
            Self::run_migrations(conn, current_version)?;
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)
                .map_err(storage_err("update schema version"))?;
            debug!(
                "Migrated database schema from v{} to v{}",
                current_version, SCHEMA_VERSION
            );
        }

        Ok(())
    }

    fn run_migrations(conn: &Connection, from_version: i32) -> Result<(), RepositoryError> {
        if from_version < 1 {
            Self::migrate_v0_to_v1(conn)?;
        }

        Ok(())
    }

    /// Migration v0 -> v1: initial schema.
    fn migrate_v0_to_v1(conn: &Connection) -> Result<(), RepositoryError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS semesters (
                id INTEGER PRIMARY KEY,
                term TEXT NOT NULL,
                year INTEGER NOT NULL,
                UNIQUE (term, year)
            );

            CREATE TABLE IF NOT EXISTS students (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                major TEXT,
                class_year TEXT,
                linkedin TEXT,
                password_hash TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                session_token TEXT PRIMARY KEY,
                student_id INTEGER NOT NULL REFERENCES students(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_student ON sessions(student_id);

            CREATE TABLE IF NOT EXISTS courses (
                id INTEGER PRIMARY KEY,
                semester_id INTEGER NOT NULL REFERENCES semesters(id) ON DELETE CASCADE,
                department TEXT NOT NULL,
                course_number TEXT NOT NULL,
                professor TEXT NOT NULL,
                UNIQUE (department, course_number, semester_id)
            );

            -- Enrollment join entity
            CREATE TABLE IF NOT EXISTS student_courses (
                student_id INTEGER NOT NULL REFERENCES students(id) ON DELETE CASCADE,
                course_id INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                PRIMARY KEY (student_id, course_id)
            );

            CREATE TABLE IF NOT EXISTS study_groups (
                id INTEGER PRIMARY KEY,
                capacity INTEGER NOT NULL DEFAULT 5 CHECK (capacity > 0),
                is_private INTEGER NOT NULL DEFAULT 0,
                owner_id INTEGER NOT NULL REFERENCES students(id) ON DELETE CASCADE,
                semester_id INTEGER NOT NULL REFERENCES semesters(id) ON DELETE CASCADE,
                course_id INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
                location TEXT NOT NULL,
                meeting_time TEXT NOT NULL,
                meeting_day TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_study_groups_course ON study_groups(course_id);

            -- Membership join entity
            CREATE TABLE IF NOT EXISTS study_group_members (
                study_group_id INTEGER NOT NULL REFERENCES study_groups(id) ON DELETE CASCADE,
                student_id INTEGER NOT NULL REFERENCES students(id) ON DELETE CASCADE,
                PRIMARY KEY (study_group_id, student_id)
            );
            CREATE INDEX IF NOT EXISTS idx_members_student ON study_group_members(student_id);

            CREATE TABLE IF NOT EXISTS study_group_join_requests (
                id INTEGER PRIMARY KEY,
                study_group_id INTEGER NOT NULL REFERENCES study_groups(id) ON DELETE CASCADE,
                student_id INTEGER NOT NULL REFERENCES students(id) ON DELETE CASCADE,
                message TEXT,
                created_at TEXT NOT NULL,
                UNIQUE (study_group_id, student_id)
            );
            CREATE INDEX IF NOT EXISTS idx_requests_student
                ON study_group_join_requests(student_id);
            "#,
        )
        .map_err(storage_err("migration v1"))
    }

    /// Run `f` in a deferred (read) transaction.
    pub async fn read<T, E, F>(&self, operation: &'static str, f: F) -> Result<T, E>
    where
        F: FnOnce(&Tx<'_>) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<RepositoryError> + Send + 'static,
    {
        self.transact(operation, TransactionBehavior::Deferred, f)
            .await
    }

    /// Run `f` in an immediate (write-locked) transaction.
    pub async fn write<T, E, F>(&self, operation: &'static str, f: F) -> Result<T, E>
    where
        F: FnOnce(&Tx<'_>) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<RepositoryError> + Send + 'static,
    {
        self.transact(operation, TransactionBehavior::Immediate, f)
            .await
    }

    async fn transact<T, E, F>(
        &self,
        operation: &'static str,
        behavior: TransactionBehavior,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&Tx<'_>) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<RepositoryError> + Send + 'static,
    {
        let conn = self.conn.clone();

        let joined = tokio::task::spawn_blocking(move || -> Result<T, E> {
            let mut guard = conn
                .lock()
                .map_err(|_| RepositoryError::storage(operation, "connection mutex poisoned"))?;
            let tx = Tx {
                inner: guard
                    .transaction_with_behavior(behavior)
                    .map_err(storage_err(operation))?,
            };

            let value = f(&tx)?;
            tx.inner.commit().map_err(storage_err(operation))?;
            Ok(value)
        })
        .await;

        match joined {
            Ok(result) => result,
            Err(e) => Err(RepositoryError::storage(operation, e.to_string()).into()),
        }
    }
}
