//! SQLite persistence for plugins and the tenant installation ledger
//!
//! All ledger and lifecycle writes go through [`Database::transaction`], which
//! commits when the closure returns `Ok` and rolls back otherwise. Transactions
//! are short and never contain container or network calls.

mod database;
mod schema;


pub use database::{Database, StorageError};
pub use schema::{SCHEMA_MIGRATIONS, SchemaMigration, SchemaVersion};
