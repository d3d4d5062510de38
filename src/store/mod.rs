//! Persistence layer: libSQL-backed settings storage.

pub mod libsql_backend;
pub(crate) mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::Database;
