//! Scoped connection acquisition.
//!
//! [`ConnectionProvider`] hands out [`DbConnection`]s either from a pool or by
//! opening a dedicated connection per use. Releasing a pooled connection
//! returns it to the pool; releasing a dedicated one closes it. Work that
//! fails inside a transaction is rolled back before the connection is
//! released (see `storage::insert`).

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use log::{debug, error, info, warn};
use sqlx::pool::PoolConnection;
use sqlx::{Any, AnyConnection, Connection};

use crate::config::{ConnectionConfig, Driver, PoolConfig};
use crate::error_handling::DatabaseError;

use super::install_drivers;
use super::pool::{connection_error, ConnectionPool};

/// A connection checked out from a [`ConnectionProvider`].
pub enum DbConnection {
    /// Opened for this use only; closed on release.
    Single(AnyConnection),
    /// Borrowed from the pool; returned on release or drop.
    Pooled(PoolConnection<Any>),
}

impl DbConnection {
    /// Gives the connection back: closes a dedicated connection, returns a
    /// pooled one to its pool.
    pub async fn release(self) {
        match self {
            DbConnection::Single(conn) => match conn.close().await {
                Ok(()) => info!("Database connection closed"),
                Err(e) => warn!("Failed to close database connection cleanly: {e}"),
            },
            DbConnection::Pooled(conn) => {
                drop(conn);
                debug!("Connection returned to pool");
            }
        }
    }
}

impl std::fmt::Debug for DbConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbConnection::Single(_) => f.write_str("DbConnection::Single"),
            DbConnection::Pooled(_) => f.write_str("DbConnection::Pooled"),
        }
    }
}

impl Deref for DbConnection {
    type Target = AnyConnection;

    fn deref(&self) -> &Self::Target {
        match self {
            DbConnection::Single(conn) => conn,
            DbConnection::Pooled(conn) => conn,
        }
    }
}

impl DerefMut for DbConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            DbConnection::Single(conn) => conn,
            DbConnection::Pooled(conn) => conn,
        }
    }
}

/// Opens one dedicated connection, giving up after `timeout`.
pub async fn connect_single(
    config: &ConnectionConfig,
    timeout: Duration,
) -> Result<AnyConnection, DatabaseError> {
    install_drivers();
    let url = config.connection_url()?;
    match tokio::time::timeout(timeout, AnyConnection::connect(&url)).await {
        Ok(Ok(conn)) => {
            info!("Database connection established: {config}");
            Ok(conn)
        }
        Ok(Err(e)) => {
            error!("Failed to connect to database {config}: {e}");
            Err(connection_error(e, timeout))
        }
        Err(_) => {
            error!("Timed out after {timeout:?} connecting to database {config}");
            Err(DatabaseError::ConnectionTimeout(timeout))
        }
    }
}

/// Source of database connections: a pool, or one connection per use.
#[derive(Clone, Debug)]
pub enum ConnectionProvider {
    /// Connect on acquire, close on release.
    Single {
        config: ConnectionConfig,
        timeout: Duration,
    },
    /// Borrow from a shared pool.
    Pooled(ConnectionPool),
}

impl ConnectionProvider {
    /// A provider that opens a dedicated connection per use.
    pub fn single(config: ConnectionConfig, timeout: Duration) -> Self {
        ConnectionProvider::Single { config, timeout }
    }

    /// A provider backed by a freshly opened pool.
    pub async fn pooled(
        config: &ConnectionConfig,
        pool_config: &PoolConfig,
    ) -> Result<Self, DatabaseError> {
        Ok(ConnectionProvider::Pooled(
            ConnectionPool::connect(config, pool_config).await?,
        ))
    }

    pub fn driver(&self) -> Driver {
        match self {
            ConnectionProvider::Single { config, .. } => config.driver,
            ConnectionProvider::Pooled(pool) => pool.driver(),
        }
    }

    pub fn pool(&self) -> Option<&ConnectionPool> {
        match self {
            ConnectionProvider::Single { .. } => None,
            ConnectionProvider::Pooled(pool) => Some(pool),
        }
    }

    /// Checks out a connection.
    ///
    /// Waits until the pool has capacity, or until a dedicated connection is
    /// established, bounded by the connection timeout in both cases.
    pub async fn acquire(&self) -> Result<DbConnection, DatabaseError> {
        match self {
            ConnectionProvider::Single { config, timeout } => {
                connect_single(config, *timeout).await.map(DbConnection::Single)
            }
            ConnectionProvider::Pooled(pool) => pool.acquire().await.map(DbConnection::Pooled),
        }
    }

    /// Gives a connection back. Equivalent to [`DbConnection::release`].
    pub async fn release(&self, conn: DbConnection) {
        conn.release().await;
    }

    /// Shuts the pool down; a no-op for dedicated connections.
    pub async fn close(&self) {
        if let ConnectionProvider::Pooled(pool) = self {
            pool.close().await;
        }
    }
}
