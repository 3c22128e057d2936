//! Storage layer for flightlog.
//!
//! This module owns the single `SQLite` connection behind the logbook. A
//! [`Store`] is created once by the application, initialized at startup and
//! disposed at shutdown. Clones share the same connection.
//!
//! All database work runs on tokio's blocking thread pool so a slow disk never
//! stalls the async request handlers.

pub mod migrations;
pub mod schema;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub use schema::SchemaSource;

/// Handle to the logbook database.
#[derive(Debug, Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    /// Path to the database file.
    path: PathBuf,
    /// Script used to create a new database.
    schema: SchemaSource,
    /// Connection lifecycle.
    state: Mutex<State>,
}

#[derive(Debug)]
enum State {
    Unopened,
    Open(Connection),
    Disposed,
}

impl Store {
    /// Create a handle for the database at `path`.
    ///
    /// Nothing is opened until [`Store::initialize`] is called.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, schema: SchemaSource) -> Self {
        Self {
            inner: Arc::new(Inner {
                path: path.into(),
                schema,
                state: Mutex::new(State::Unopened),
            }),
        }
    }

    /// Create an initialized in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        bootstrap(&conn, &SchemaSource::Embedded)?;
        migrations::run(&conn)?;

        Ok(Self {
            inner: Arc::new(Inner {
                path: PathBuf::from(":memory:"),
                schema: SchemaSource::Embedded,
                state: Mutex::new(State::Open(conn)),
            }),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Returns true between a successful `initialize` and `dispose`.
    ///
    /// Waits for any running operation to release the connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Task`] if the blocking task fails.
    pub async fn is_open(&self) -> Result<bool> {
        let inner = Arc::clone(&self.inner);
        let open =
            tokio::task::spawn_blocking(move || matches!(*inner.lock(), State::Open(_))).await?;
        Ok(open)
    }

    /// Open the database, creating and bootstrapping it if the file is absent.
    ///
    /// Calling this on an open store does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaSetup`] if a new database cannot be bootstrapped,
    /// another setup error if the file cannot be opened or migrated, and
    /// [`Error::StoreClosed`] if the store was already disposed.
    pub async fn initialize(&self) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.initialize()).await?
    }

    /// Close the connection.
    ///
    /// Safe to call more than once. Every later operation fails with
    /// [`Error::StoreClosed`].
    ///
    /// # Errors
    ///
    /// Returns an error if `SQLite` reports a failure while closing.
    pub async fn dispose(&self) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.dispose()).await?
    }

    /// Run `f` against the open connection on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or a lifecycle error if the store is not open.
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let state = inner.lock();
            match &*state {
                State::Open(conn) => f(conn),
                State::Unopened => Err(Error::StoreNotInitialized),
                State::Disposed => Err(Error::StoreClosed),
            }
        })
        .await?
    }

    /// Current schema version recorded in the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is not open or the query fails.
    pub async fn schema_version(&self) -> Result<i32> {
        self.call(migrations::schema_version).await
    }
}

impl Inner {
    /// Lock the state, recovering from a panic in another request.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn initialize(&self) -> Result<()> {
        let mut state = self.lock();
        match *state {
            State::Open(_) => return Ok(()),
            State::Disposed => return Err(Error::StoreClosed),
            State::Unopened => {}
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let existed = self.path.exists();
        debug!("Opening database at {}", self.path.display());
        let conn = Connection::open(&self.path).map_err(|source| Error::DatabaseOpen {
            path: self.path.clone(),
            source,
        })?;

        if !existed {
            if let Err(err) = bootstrap(&conn, &self.schema) {
                drop(conn);
                remove_database_files(&self.path);
                return Err(err);
            }
            info!("Created new logbook database at {}", self.path.display());
        }

        // WAL keeps readers from blocking the single writer
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::run(&conn)?;

        info!("Database connected at {}", self.path.display());
        *state = State::Open(conn);
        Ok(())
    }

    fn dispose(&self) -> Result<()> {
        let mut state = self.lock();
        match std::mem::replace(&mut *state, State::Disposed) {
            State::Open(conn) => {
                conn.close().map_err(|(_, err)| Error::DatabaseQuery(err))?;
                info!("Database connection closed");
                Ok(())
            }
            State::Unopened | State::Disposed => Ok(()),
        }
    }
}

/// Apply the schema script to a fresh database as one transaction.
fn bootstrap(conn: &Connection, schema: &SchemaSource) -> Result<()> {
    let script = schema.read()?;
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::schema_setup(e.to_string()))?;
    tx.execute_batch(&script)
        .map_err(|e| Error::schema_setup(e.to_string()))?;
    tx.commit().map_err(|e| Error::schema_setup(e.to_string()))?;
    Ok(())
}

/// Remove a half-created database so the next start bootstraps again.
fn remove_database_files(path: &Path) {
    for suffix in ["", "-wal", "-shm", "-journal"] {
        let mut name = OsString::from(path.as_os_str());
        name.push(suffix);
        let file = PathBuf::from(name);
        if file.exists() {
            if let Err(e) = std::fs::remove_file(&file) {
                warn!("Failed to remove {}: {}", file.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_flights(conn: &Connection) -> Result<i64> {
        Ok(conn.query_row("SELECT COUNT(*) FROM flights", [], |row| row.get(0))?)
    }

    #[tokio::test]
    async fn test_open_in_memory() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.is_open().await.unwrap());
        assert_eq!(store.path().to_string_lossy(), ":memory:");
        assert_eq!(store.call(count_flights).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_initialize_bootstraps_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("logbook.db");

        let store = Store::new(&path, SchemaSource::Embedded);
        assert!(!store.is_open().await.unwrap());
        store.initialize().await.unwrap();

        assert!(path.exists());
        assert!(store.is_open().await.unwrap());
        assert_eq!(store.call(count_flights).await.unwrap(), 0);
        assert_eq!(
            store.schema_version().await.unwrap(),
            migrations::CURRENT_VERSION
        );
        store.dispose().await.unwrap();
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("logbook.db"), SchemaSource::Embedded);

        store.initialize().await.unwrap();
        store
            .call(|conn| {
                conn.execute(
                    "INSERT INTO flights (date, departure_place, departure_time, arrival_place, \
                     arrival_time, pilot_in_command) \
                     VALUES ('2025-01-01', 'A', '10:00', 'B', '11:00', 'SELF')",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();
        store.initialize().await.unwrap();

        assert_eq!(store.call(count_flights).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_existing_file_skips_bootstrap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logbook.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute("CREATE TABLE unrelated (x INTEGER)", []).unwrap();
        }

        let store = Store::new(
            &path,
            SchemaSource::File(dir.path().join("does-not-exist.sql")),
        );
        store.initialize().await.unwrap();

        let err = store.call(count_flights).await.unwrap_err();
        assert!(matches!(err, Error::DatabaseQuery(_)));
    }

    #[tokio::test]
    async fn test_unreadable_schema_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logbook.db");
        let store = Store::new(&path, SchemaSource::File(dir.path().join("missing.sql")));

        let err = store.initialize().await.unwrap_err();
        assert!(matches!(err, Error::SchemaSetup { .. }));
        assert!(!store.is_open().await.unwrap());
        assert!(!path.exists());

        let err = store.call(count_flights).await.unwrap_err();
        assert!(matches!(err, Error::StoreNotInitialized));
    }

    #[tokio::test]
    async fn test_broken_schema_is_applied_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logbook.db");
        let script = dir.path().join("schema.sql");
        std::fs::write(
            &script,
            "CREATE TABLE flights (id INTEGER PRIMARY KEY);\nCREATE TABLE oops (;\n",
        )
        .unwrap();

        let store = Store::new(&path, SchemaSource::File(script));
        let err = store.initialize().await.unwrap_err();
        assert!(err.is_setup_error());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_operations_before_initialize_fail() {
        let store = Store::new("/nonexistent/logbook.db", SchemaSource::Embedded);
        let err = store.call(count_flights).await.unwrap_err();
        assert!(matches!(err, Error::StoreNotInitialized));
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent_and_final() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("logbook.db"), SchemaSource::Embedded);
        store.initialize().await.unwrap();

        store.dispose().await.unwrap();
        store.dispose().await.unwrap();
        assert!(!store.is_open().await.unwrap());

        let err = store.call(count_flights).await.unwrap_err();
        assert!(matches!(err, Error::StoreClosed));

        let err = store.initialize().await.unwrap_err();
        assert!(matches!(err, Error::StoreClosed));
    }

    #[tokio::test]
    async fn test_dispose_unopened_store() {
        let store = Store::new("/nonexistent/logbook.db", SchemaSource::Embedded);
        store.dispose().await.unwrap();
        assert!(matches!(
            store.call(count_flights).await.unwrap_err(),
            Error::StoreClosed
        ));
    }

    #[tokio::test]
    async fn test_clones_share_connection() {
        let store = Store::open_in_memory().unwrap();
        let clone = store.clone();

        clone.dispose().await.unwrap();
        assert!(!store.is_open().await.unwrap());
    }

    #[tokio::test]
    async fn test_panic_in_call_does_not_poison_store() {
        let store = Store::open_in_memory().unwrap();
        let result: Result<()> = store.call(|_| panic!("handler bug")).await;
        assert!(matches!(result, Err(Error::Task(_))));

        assert_eq!(store.call(count_flights).await.unwrap(), 0);
    }

    #[test]
    fn test_remove_database_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logbook.db");
        std::fs::write(&path, b"").unwrap();
        std::fs::write(dir.path().join("logbook.db-wal"), b"").unwrap();

        remove_database_files(&path);

        assert!(!path.exists());
        assert!(!dir.path().join("logbook.db-wal").exists());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_is_open_does_not_block_runtime_during_query() {
        use std::time::{Duration, Instant};

        let store = Store::open_in_memory().unwrap();
        let (locked_tx, locked_rx) = tokio::sync::oneshot::channel();
        let busy = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .call(move |_| {
                        let _ = locked_tx.send(());
                        std::thread::sleep(Duration::from_millis(300));
                        Ok(())
                    })
                    .await
            })
        };
        locked_rx.await.unwrap();

        let ticker = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Instant::now()
        });
        assert!(store.is_open().await.unwrap());
        let checked_at = Instant::now();

        // The timer fired while is_open was still waiting for the connection.
        assert!(ticker.await.unwrap() < checked_at);
        busy.await.unwrap().unwrap();
    }
}
