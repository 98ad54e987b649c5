// storage/mod.rs
// Database access: connections, table creation, batched inserts

pub mod connection;
pub mod dialect;
pub mod insert;
pub mod pool;
pub mod schema;

#[cfg(test)]
pub(crate) mod test_helpers;

use std::sync::Once;

// Re-export commonly used items
pub use connection::{connect_single, ConnectionProvider, DbConnection};
pub use dialect::validate_identifier;
pub use insert::{BatchInserter, InsertMode, InsertReport};
pub use pool::ConnectionPool;
pub use schema::{ColumnDef, PrimaryKey, TableInitializer, TableSchema};

static INSTALL_DRIVERS: Once = Once::new();

/// Registers the compiled-in `sqlx` drivers with the `Any` driver.
///
/// Must run before the first `Any` connection is opened; repeat calls are no-ops.
pub(crate) fn install_drivers() {
    INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);
}
