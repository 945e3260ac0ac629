//! Database layer
//!
//! Supports SQLite (default, single file deployment) and MySQL. The driver
//! is selected by `database.driver` in the configuration and hidden behind
//! the `DatabasePool` trait, so repositories can serve either backend.
//!
//! ```ignore
//! use cliniclane::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config.database).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MySqlBackend, SqliteBackend,
};
