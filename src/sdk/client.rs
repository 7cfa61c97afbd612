use std::time::Duration;
use async_trait::async_trait;
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::Mutex;
use crate::protocol::{decode_result, encode_query, read_frame, write_frame, Query, QueryResult};
use crate::server::udp::MAX_DATAGRAM_SIZE;
use crate::{Error, Result};

/// A remote Keyval server reachable over one of the binary transports.
///
/// Results come back as-is: a `NotFound` or `BadRequest` status is a
/// successful exchange, only transport and codec failures are errors.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Sends one query and waits for its result.
    async fn execute(&self, query: Query) -> Result<QueryResult>;

    async fn select(&self, key: &str) -> Result<QueryResult> {
        self.execute(Query::select(key)).await
    }

    async fn insert(&self, key: &str, value: &[u8]) -> Result<QueryResult> {
        self.execute(Query::insert(key, value)).await
    }

    async fn delete(&self, key: &str) -> Result<QueryResult> {
        self.execute(Query::delete(key)).await
    }
}

/// Client for the connection-oriented transport.
///
/// The server closes each connection after one exchange, so every query
/// opens a fresh connection.
pub struct TcpClient {
    addr: String,
}

impl TcpClient {
    pub fn new(addr: &str) -> Self {
        Self { addr: addr.to_string() }
    }

    /// Creates a client after checking that `addr` resolves. No connection is
    /// opened until the first query.
    pub async fn connect(addr: &str) -> Result<Self> {
        tokio::net::lookup_host(addr)
            .await?
            .next()
            .ok_or_else(|| Error::InvalidEndpoint(addr.to_string()))?;
        Ok(Self::new(addr))
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn open(&self) -> Result<TcpStream> {
        // Retry logic
        let mut attempt = 0u64;
        loop {
            match TcpStream::connect(&self.addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) if attempt == 2 => return Err(e.into()),
                Err(_) => {
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(attempt * 200)).await;
                }
            }
        }
    }
}

#[async_trait]
impl RemoteStore for TcpClient {
    async fn execute(&self, query: Query) -> Result<QueryResult> {
        let mut stream = self.open().await?;
        stream.set_nodelay(true)?;
        write_frame(&mut stream, &encode_query(&query)?).await?;
        let frame = read_frame(&mut stream).await?;
        decode_result(&frame)
    }
}

/// Client for the connectionless transport.
///
/// Queries are sent one at a time so each received datagram answers the
/// query that is in flight.
pub struct UdpClient {
    socket: Mutex<UdpSocket>,
    timeout: Duration,
}

impl UdpClient {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub async fn connect(addr: &str) -> Result<Self> {
        let target = tokio::net::lookup_host(addr)
            .await?
            .next()
            .ok_or_else(|| Error::InvalidEndpoint(addr.to_string()))?;
        let local = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(target).await?;
        Ok(Self {
            socket: Mutex::new(socket),
            timeout: Self::DEFAULT_TIMEOUT,
        })
    }

    /// Sets how long to wait for each response datagram.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends raw bytes as one datagram and decodes the answer. Useful for
    /// exercising the server with payloads the codec would never produce.
    pub async fn send_raw(&self, payload: &[u8]) -> Result<QueryResult> {
        let socket = self.socket.lock().await;
        socket.send(payload).await?;

        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let len = tokio::time::timeout(self.timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| Error::Timeout("udp response".to_string()))??;
        decode_result(&buf[..len])
    }
}

#[async_trait]
impl RemoteStore for UdpClient {
    async fn execute(&self, query: Query) -> Result<QueryResult> {
        let payload = encode_query(&query)?;
        if payload.len() > MAX_DATAGRAM_SIZE {
            return Err(Error::Internal(format!(
                "query is {} bytes, datagrams are limited to {}",
                payload.len(),
                MAX_DATAGRAM_SIZE
            )));
        }
        self.send_raw(&payload).await
    }
}
