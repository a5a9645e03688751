//! The handle to the SQLite database that holds the product transactions.

use std::{
    path::Path,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tokio::task::JoinError;

use crate::{Error, db::initialize};

/// The most read connections the store keeps open at once.
const READ_POOL_SIZE: u32 = 4;

static IN_MEMORY_DATABASES: AtomicU64 = AtomicU64::new(0);

/// A shared handle to the transaction database.
///
/// Open one at start-up, clone it into whatever needs it, and call
/// [TransactionStore::close] at shutdown.
///
/// Reads borrow a connection from a pool of read-only connections so they do
/// not wait on each other. Writes go through a single writer connection, one
/// at a time. Every operation runs on tokio's blocking thread pool and fails
/// with [Error::StoreTimeout] if it does not finish within the store's
/// timeout.
#[derive(Debug, Clone)]
pub struct TransactionStore {
    /// Read-only connections.
    readers: Pool<SqliteConnectionManager>,
    /// The only connection that may modify the database.
    writer: Arc<Mutex<Connection>>,
    /// The longest a single store operation may take, including waiting for
    /// a connection.
    timeout: Duration,
}

impl TransactionStore {
    /// The timeout used when none is configured.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Open (or create) the database at `path` in WAL mode.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the file cannot be opened or the tables
    /// cannot be created, or an [Error::ConnectionPool] if the read
    /// connections cannot be opened.
    pub fn open(path: impl AsRef<Path>, timeout: Duration) -> Result<Self, Error> {
        Self::connect(path.as_ref(), timeout)
    }

    /// Open a private, empty in-memory database.
    ///
    /// The read connections share the database with the writer through
    /// SQLite's shared cache, where a read that overlaps an uncommitted write
    /// fails instead of waiting. Use [TransactionStore::open] when reads and
    /// writes must run side by side.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the database cannot be initialized, or
    /// an [Error::ConnectionPool] if the read connections cannot be opened.
    pub fn open_in_memory(timeout: Duration) -> Result<Self, Error> {
        let id = IN_MEMORY_DATABASES.fetch_add(1, Ordering::Relaxed);
        let uri = format!(
            "file:sales-insights-{}-{id}?mode=memory&cache=shared",
            std::process::id()
        );

        Self::connect(Path::new(&uri), timeout)
    }

    fn connect(location: &Path, timeout: Duration) -> Result<Self, Error> {
        let writer = Connection::open(location)?;
        writer.busy_timeout(timeout)?;
        writer.pragma_update(None, "journal_mode", "WAL")?;
        initialize(&writer)?;

        let manager = SqliteConnectionManager::file(location).with_init(move |connection| {
            connection.busy_timeout(timeout)?;
            connection.pragma_update(None, "query_only", true)
        });
        let readers = Pool::builder()
            .max_size(READ_POOL_SIZE)
            .min_idle(Some(1))
            .connection_timeout(timeout.max(Duration::from_millis(1)))
            .build(manager)
            .map_err(|error| Error::ConnectionPool(error.to_string()))?;

        Ok(Self {
            readers,
            writer: Arc::new(Mutex::new(writer)),
            timeout,
        })
    }

    /// The longest a single store operation may take.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[cfg(test)]
    pub(crate) fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `operation` against a read-only connection on the blocking thread
    /// pool.
    ///
    /// The operation keeps running in the background if it times out, but its
    /// result is discarded.
    ///
    /// # Errors
    /// Returns:
    /// - whatever error `operation` returns,
    /// - [Error::ConnectionPool] if no read connection became free in time,
    /// - [Error::StoreTimeout] if the operation did not finish in time,
    /// - or [Error::StoreTaskFailed] if the operation panicked.
    pub async fn read<T, F>(&self, operation: F) -> Result<T, Error>
    where
        F: FnOnce(&Connection) -> Result<T, Error> + Send + 'static,
        T: Send + 'static,
    {
        let readers = self.readers.clone();

        let task = tokio::task::spawn_blocking(move || {
            let connection = readers.get().map_err(|error| {
                tracing::error!("could not get a read connection: {error}");
                Error::ConnectionPool(error.to_string())
            })?;

            operation(&connection)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(joined) => join_result(joined),
            Err(_) => {
                tracing::error!("store read timed out after {:?}", self.timeout);
                Err(Error::StoreTimeout(self.timeout))
            }
        }
    }

    /// Run `operation` against the writer connection on the blocking thread
    /// pool.
    ///
    /// When the timeout expires the `operation`'s [CancelToken] is cancelled
    /// and the store waits for the operation to stop. An operation that
    /// checks the token and returns its error rolls back, and the caller gets
    /// [Error::StoreTimeout]. An operation that finishes without noticing the
    /// cancellation keeps its changes, and the caller gets its result.
    ///
    /// # Errors
    /// Returns:
    /// - whatever error `operation` returns,
    /// - [Error::StoreTimeout] if the operation was cancelled after timing out,
    /// - or [Error::StoreTaskFailed] if the operation panicked.
    pub async fn write<T, F>(&self, operation: F) -> Result<T, Error>
    where
        F: FnOnce(&Connection, &CancelToken) -> Result<T, Error> + Send + 'static,
        T: Send + 'static,
    {
        let writer = self.writer.clone();
        let cancel = CancelToken::default();
        let task_cancel = cancel.clone();

        let mut task = tokio::task::spawn_blocking(move || {
            let connection = match writer.lock() {
                Ok(connection) => connection,
                Err(poisoned) => {
                    tracing::warn!("a previous write panicked, recovering the writer connection");
                    writer.clear_poison();
                    let connection = poisoned.into_inner();
                    if !connection.is_autocommit() {
                        connection.execute_batch("ROLLBACK")?;
                    }
                    connection
                }
            };

            // The timeout may have expired while waiting for the writer.
            task_cancel.check()?;

            operation(&connection, &task_cancel)
        });

        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(joined) => join_result(joined),
            Err(_) => {
                tracing::error!(
                    "store write timed out after {:?}, cancelling it",
                    self.timeout
                );
                cancel.cancel();

                match join_result(task.await) {
                    Ok(value) => {
                        tracing::warn!("the write finished before it saw the cancellation");
                        Ok(value)
                    }
                    Err(error) => {
                        tracing::debug!("the timed out write stopped with: {error}");
                        Err(Error::StoreTimeout(self.timeout))
                    }
                }
            }
        }
    }

    /// Close the writer connection and the read connections.
    ///
    /// If other clones of this handle are still alive, e.g. an operation that
    /// timed out is still running, the connections are closed when the last
    /// one is dropped instead.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if SQLite fails to close the writer.
    pub fn close(self) -> Result<(), Error> {
        match Arc::try_unwrap(self.writer) {
            Ok(mutex) => {
                let connection = mutex.into_inner().unwrap_or_else(PoisonError::into_inner);
                connection.close().map_err(|(_, error)| Error::from(error))?;
                tracing::info!("Closed the transaction store.");
                Ok(())
            }
            Err(_) => {
                tracing::warn!(
                    "The transaction store is still in use, it will close once the last operation finishes."
                );
                Ok(())
            }
        }
    }
}

fn join_result<T>(joined: Result<Result<T, Error>, JoinError>) -> Result<T, Error> {
    joined.unwrap_or_else(|join_error| {
        tracing::error!("store task failed: {join_error}");
        Err(Error::StoreTaskFailed(join_error.to_string()))
    })
}

/// Tells a running write that it has run out of time.
///
/// Long writes should call [CancelToken::check] between steps and return its
/// error so that their SQL transaction rolls back.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Whether the write should stop.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Returns [Error::WriteCancelled] once the write should stop.
    ///
    /// # Errors
    /// Returns [Error::WriteCancelled] if the token has been cancelled.
    pub fn check(&self) -> Result<(), Error> {
        if self.is_cancelled() {
            Err(Error::WriteCancelled)
        } else {
            Ok(())
        }
    }

    pub(crate) fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }
}
