//! Synchronous mock client.

mod batch;
mod conn;
mod transaction;

pub use batch::BatchResults;
pub use conn::Conn;
pub use transaction::Transaction;
