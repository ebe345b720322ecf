//! PostgreSQL target driver.
//!
//! [`PostgresWriter`] holds one `tokio_postgres` client and executes
//! prepared inserts inside a transaction.

mod writer;

pub use writer::PostgresWriter;
