//! Pooled context factory.
//!
//! # Responsibility
//! - Hold connection options for one database file.
//! - Build an `r2d2` pool whose connections are configured on creation.
//! - Hand out `CallContext` sessions backed by pooled connections.
//!
//! # Invariants
//! - Every pooled connection has `foreign_keys=ON` and a busy timeout.
//! - The factory is safe for sequential reuse across tests.

use super::{CallContext, ContextResult};
use crate::db::{configure_connection, DbResult};
use log::{error, info};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const DEFAULT_MAX_POOL_SIZE: u32 = 4;
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection options for a context factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextOptions {
    path: PathBuf,
    max_pool_size: u32,
    busy_timeout: Duration,
    connect_timeout: Duration,
}

impl ContextOptions {
    /// Options for the database file at `path` with default pool settings.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Sets the maximum number of pooled connections. Zero is raised to one.
    pub fn with_max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = size.max(1);
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// How long pool construction and checkout wait for a connection.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_pool_size(&self) -> u32 {
        self.max_pool_size
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

/// Factory of pooled `CallContext` sessions.
#[derive(Clone)]
pub struct ContextFactory {
    pool: Pool<SqliteConnectionManager>,
    options: ContextOptions,
}

impl ContextFactory {
    /// Builds the connection pool.
    ///
    /// # Side effects
    /// - Opens at least one connection eagerly; an unreachable database
    ///   fails here rather than at first use.
    /// - Emits `pool_build` logging events.
    pub fn new(options: ContextOptions) -> DbResult<Self> {
        let started_at = Instant::now();
        info!(
            "event=pool_build module=context status=start max_size={}",
            options.max_pool_size
        );

        let busy_timeout = options.busy_timeout;
        let manager = SqliteConnectionManager::file(&options.path)
            .with_init(move |conn| configure_connection(conn, busy_timeout));
        let pool = match Pool::builder()
            .max_size(options.max_pool_size)
            .connection_timeout(options.connect_timeout)
            .build(manager)
        {
            Ok(pool) => pool,
            Err(err) => {
                error!(
                    "event=pool_build module=context status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
        };

        info!(
            "event=pool_build module=context status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(Self { pool, options })
    }

    /// Checks out a pooled connection and wraps it in a fresh context.
    ///
    /// The new context starts with an empty change tracker.
    pub fn create_context(&self) -> ContextResult<CallContext> {
        let conn = self.pool.get().map_err(crate::db::DbError::from)?;
        Ok(CallContext::new(conn))
    }

    /// Creates the schema through a short-lived context.
    pub fn ensure_created(&self) -> ContextResult<bool> {
        self.create_context()?.ensure_created()
    }

    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    /// Number of idle plus checked-out connections currently held.
    pub fn open_connections(&self) -> u32 {
        self.pool.state().connections
    }
}
