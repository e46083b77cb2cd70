//! r2d2 connection pool for the local SQLite database.

use std::path::Path;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, info, instrument, warn};

use super::config::SqlitePoolConfig;
use super::pragmas::apply_connection_pragmas;
use crate::storage::error::{StorageError, StorageResult};

/// Pooled SQLite connection. Derefs to [`rusqlite::Connection`].
pub type SqliteConnection = PooledConnection<SqliteConnectionManager>;

/// SQLite connection pool
///
/// Every connection gets the pragmas from [`SqlitePoolConfig`] applied when
/// it is opened. Schema management is left to the owning application.
#[derive(Debug)]
pub struct SqlitePool {
    pool: Pool<SqliteConnectionManager>,
    config: SqlitePoolConfig,
}

impl SqlitePool {
    /// Open (or create) the database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file can't be opened or the first connection
    /// fails its pragma setup.
    #[instrument(fields(db_path = ?path, pool_size = config.max_size))]
    pub fn open(path: &Path, config: SqlitePoolConfig) -> StorageResult<Self> {
        info!("Creating SQLite connection pool");

        let pool_config = config.clone();
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            apply_connection_pragmas(conn, &pool_config)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
        });

        let pool = Pool::builder()
            .max_size(config.max_size.max(1))
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| {
                warn!("Failed to create connection pool: {}", e);
                StorageError::Connection(format!("Failed to create pool: {e}"))
            })?;

        info!("SQLite pool created with {} connections", config.max_size);

        Ok(Self { pool, config })
    }

    /// Acquire a connection from the pool.
    pub fn get(&self) -> StorageResult<SqliteConnection> {
        match self.pool.get() {
            Ok(conn) => Ok(conn),
            Err(e) => {
                let message = e.to_string();
                if message.to_lowercase().contains("timed out") {
                    warn!("Connection timeout after {:?}", self.config.connection_timeout);
                    Err(StorageError::Timeout(self.config.connection_timeout.as_secs()))
                } else {
                    warn!("Connection error: {}", message);
                    Err(StorageError::Connection(format!("Failed to get connection: {message}")))
                }
            }
        }
    }

    /// Run `SELECT 1` on a pooled connection.
    pub fn health_check(&self) -> StorageResult<()> {
        let conn = self.get()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i32>(0))?;
        debug!("SQLite pool health check passed");
        Ok(())
    }

    /// Configured maximum pool size.
    pub fn max_size(&self) -> u32 {
        self.pool.max_size()
    }

    /// Connections currently open (idle or checked out).
    pub fn connections(&self) -> u32 {
        self.pool.state().connections
    }
}
