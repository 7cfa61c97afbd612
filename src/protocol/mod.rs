//! Protocol-agnostic request/response model shared by every transport.
//!
//! The ordinals of [`Method`] and [`Status`] are the binary wire contract.
//! Neither is versioned on the wire, so clients and servers must agree on them.

pub mod codec;
pub mod dispatch;

use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::Error;

pub use codec::{decode_query, decode_result, encode_query, encode_result, read_frame, write_frame};
pub use dispatch::Dispatcher;

/// The operation requested by a [`Query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum Method {
    Select,
    Insert,
    Delete,
    /// An ordinal this build does not recognise. Dispatches to `NotFound`.
    Unknown(u32),
}

impl From<u32> for Method {
    fn from(code: u32) -> Self {
        match code {
            0 => Method::Select,
            1 => Method::Insert,
            2 => Method::Delete,
            other => Method::Unknown(other),
        }
    }
}

impl From<Method> for u32 {
    fn from(method: Method) -> Self {
        match method {
            Method::Select => 0,
            Method::Insert => 1,
            Method::Delete => 2,
            Method::Unknown(code) => code,
        }
    }
}

/// Outcome of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Status {
    Ok,
    /// An insert overwrote an existing value.
    Created,
    BadRequest,
    NotFound,
    ServerError,
}

impl TryFrom<u32> for Status {
    type Error = Error;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Status::Ok),
            1 => Ok(Status::Created),
            2 => Ok(Status::BadRequest),
            3 => Ok(Status::NotFound),
            4 => Ok(Status::ServerError),
            other => Err(Error::UnknownStatus(other)),
        }
    }
}

impl From<Status> for u32 {
    fn from(status: Status) -> Self {
        match status {
            Status::Ok => 0,
            Status::Created => 1,
            Status::BadRequest => 2,
            Status::NotFound => 3,
            Status::ServerError => 4,
        }
    }
}

/// A decoded client request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub method: Method,
    pub key: String,
    /// Only meaningful for [`Method::Insert`].
    pub value: Vec<u8>,
}

impl Query {
    pub fn select(key: impl Into<String>) -> Self {
        Self { method: Method::Select, key: key.into(), value: Vec::new() }
    }

    pub fn insert(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self { method: Method::Insert, key: key.into(), value: value.into() }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self { method: Method::Delete, key: key.into(), value: Vec::new() }
    }
}

/// The response to a [`Query`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub status: Status,
    pub value: Vec<u8>,
    /// Human-readable time spent dispatching, e.g. `1.2µs`. Empty when the
    /// query never reached the dispatcher.
    pub duration: String,
}

impl QueryResult {
    pub fn new(status: Status, value: Vec<u8>, elapsed: Duration) -> Self {
        Self { status, value, duration: format!("{:?}", elapsed) }
    }

    /// A bare result carrying only a status, used when a message could not be decoded.
    pub fn from_status(status: Status) -> Self {
        Self { status, value: Vec::new(), duration: String::new() }
    }

    pub fn server_error() -> Self {
        Self::from_status(Status::ServerError)
    }

    /// True for `Ok` and `Created`.
    pub fn is_success(&self) -> bool {
        matches!(self.status, Status::Ok | Status::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_ordinals() {
        assert_eq!(u32::from(Method::Select), 0);
        assert_eq!(u32::from(Method::Insert), 1);
        assert_eq!(u32::from(Method::Delete), 2);
        assert_eq!(Method::from(7), Method::Unknown(7));
        assert_eq!(u32::from(Method::Unknown(7)), 7);
    }

    #[test]
    fn test_status_ordinals() {
        let all = [
            Status::Ok,
            Status::Created,
            Status::BadRequest,
            Status::NotFound,
            Status::ServerError,
        ];
        for (code, status) in all.into_iter().enumerate() {
            assert_eq!(u32::from(status), code as u32);
            assert_eq!(Status::try_from(code as u32).unwrap(), status);
        }
        assert!(matches!(Status::try_from(5), Err(Error::UnknownStatus(5))));
    }

    #[test]
    fn test_result_constructors() {
        let res = QueryResult::new(Status::Created, Vec::new(), Duration::from_micros(3));
        assert_eq!(res.duration, "3µs");
        assert!(res.is_success());

        let res = QueryResult::server_error();
        assert_eq!(res.status, Status::ServerError);
        assert!(res.duration.is_empty());
        assert!(!res.is_success());
    }
}
