//! Keyval is an in-memory Key-Value (KV) store served over three independent wire protocols.
//!
//! The key space is split across a fixed number of lock-guarded buckets, so concurrent
//! callers only contend when their keys land in the same bucket. Every transport decodes
//! exactly one [`protocol::Query`], runs it through the shared [`protocol::Dispatcher`] and
//! answers with exactly one [`protocol::QueryResult`].
//!
//! ## Core Components
//! - [`engine`]: The storage backend (buckets and the partitioned store).
//! - [`protocol`]: Query/result model, binary codec and the dispatcher.
//! - [`server`]: HTTP, TCP and UDP adapters.
//! - [`sdk`]: Clients for the binary transports.

pub mod engine;
pub mod protocol;
pub mod sdk;
pub mod server;

use thiserror::Error;

/// Errors returned by the transports, codecs and clients.
///
/// The store itself never fails; absence is reported through return values.
#[derive(Error, Debug)]
pub enum Error {
    /// A wire payload could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
    /// A length-prefixed frame announced more bytes than we accept.
    #[error("frame too large: {0} bytes")]
    FrameTooLarge(usize),
    /// A result carried a status ordinal this build does not know.
    #[error("unknown status code: {0}")]
    UnknownStatus(u32),
    /// An endpoint string could not be parsed.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// A remote peer did not answer in time.
    #[error("timed out waiting for {0}")]
    Timeout(String),
    /// A stop was requested while no serve loop was running.
    #[error("adapter is not serving")]
    NotServing,
    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
    /// An I/O error occurred during network communication.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for Keyval operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The storage contract shared by a single bucket and the partitioned store.
///
/// None of the operations can fail.
pub trait Store: Send + Sync {
    /// Stores `value` under `key`. Returns true if an existing value was overwritten.
    fn set(&self, key: &str, value: Vec<u8>) -> bool;
    /// Returns a copy of the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    /// Removes `key`. Returns true if a value was present.
    fn delete(&self, key: &str) -> bool;
}
