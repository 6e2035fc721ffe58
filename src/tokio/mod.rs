//! Asynchronous mock client using Tokio.

mod batch;
mod conn;
mod transaction;

pub use batch::BatchResults;
pub use conn::Conn;
pub use transaction::Transaction;
