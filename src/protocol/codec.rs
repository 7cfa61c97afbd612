//! Binary encoding of queries and results.
//!
//! Payloads are `bincode` (fixed-width little-endian integers, `u64` length
//! prefixes). On stream transports each payload is wrapped in a frame:
//!
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ Len (4)  │       bincode payload       │
//! └──────────┴─────────────────────────────┘
//! ```
//!
//! Datagram transports send the bare payload.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use crate::{Error, Result};
use super::{Query, QueryResult};

/// Largest frame payload accepted on stream transports (16 MB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

pub fn encode_query(query: &Query) -> Result<Vec<u8>> {
    Ok(bincode::serialize(query)?)
}

pub fn decode_query(bytes: &[u8]) -> Result<Query> {
    Ok(bincode::deserialize(bytes)?)
}

pub fn encode_result(result: &QueryResult) -> Result<Vec<u8>> {
    Ok(bincode::serialize(result)?)
}

pub fn decode_result(bytes: &[u8]) -> Result<QueryResult> {
    Ok(bincode::deserialize(bytes)?)
}

/// Reads one length-prefixed frame.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>> {
    let len = reader.read_u32().await? as usize;
    if len > MAX_FRAME_SIZE {
        return Err(Error::FrameTooLarge(len));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

/// Writes one length-prefixed frame and flushes it.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    if payload.len() > MAX_FRAME_SIZE {
        return Err(Error::FrameTooLarge(payload.len()));
    }
    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}
