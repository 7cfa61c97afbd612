use std::env;
use crate::sdk::{RemoteStore, TcpClient, UdpClient};
use crate::server::{parse_endpoint, Transport, DEFAULT_TCP_PORT, DEFAULT_UDP_PORT};
use crate::Result;

/// Environment variable naming the server endpoint used by [`from_env`].
pub const ADDR_ENV: &str = "KEYVAL_ADDR";
/// Endpoint used when [`ADDR_ENV`] is not set.
pub const DEFAULT_ENDPOINT: &str = "tcp://127.0.0.1:8081";

/// Connects to a Keyval server, picking the client from the endpoint scheme.
///
/// `tcp://host:port` (or no scheme) uses the connection-oriented transport,
/// `udp://host:port` the connectionless one. A missing port falls back to the
/// transport's default port.
///
/// # Examples
///
/// ```no_run
/// use keyval::sdk::{self, RemoteStore};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let store = sdk::connect("udp://127.0.0.1:8082").await?;
///     store.insert("abc", b"hello").await?;
///     Ok(())
/// }
/// ```
pub async fn connect(endpoint: &str) -> Result<Box<dyn RemoteStore>> {
    let default_port = if endpoint.starts_with("udp://") {
        DEFAULT_UDP_PORT
    } else {
        DEFAULT_TCP_PORT
    };
    let endpoint = parse_endpoint(endpoint, Transport::Tcp, default_port)?;
    log::debug!("connecting to {}", endpoint);

    match endpoint.transport {
        Transport::Tcp => Ok(Box::new(TcpClient::connect(&endpoint.addr).await?)),
        Transport::Udp => Ok(Box::new(UdpClient::connect(&endpoint.addr).await?)),
    }
}

/// Connects to the endpoint in `KEYVAL_ADDR`, or [`DEFAULT_ENDPOINT`].
pub async fn from_env() -> Result<Box<dyn RemoteStore>> {
    let endpoint = env::var(ADDR_ENV)
        .ok()
        .filter(|addr| !addr.is_empty())
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
    connect(&endpoint).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PartitionedStore;
    use crate::protocol::{Dispatcher, Status};
    use crate::server::{TcpServer, UdpServer};
    use crate::{Error, Store};
    use std::sync::Arc;
    use tokio::net::{TcpListener, UdpSocket};

    fn dispatcher() -> Arc<Dispatcher> {
        Arc::new(Dispatcher::new(Arc::new(PartitionedStore::new(4))))
    }

    #[tokio::test]
    async fn test_connect_by_scheme() {
        let d = dispatcher();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let tcp_port = listener.local_addr().unwrap().port();
        let tcp = TcpServer::new(d.clone());
        tokio::spawn(async move { tcp.serve(&listener).await });

        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let udp_port = socket.local_addr().unwrap().port();
        let udp = UdpServer::new(d.clone());
        tokio::spawn(async move { udp.serve(socket).await });

        let store = connect(&format!("udp://127.0.0.1:{}", udp_port)).await.unwrap();
        assert_eq!(store.insert("via-udp", b"1").await.unwrap().status, Status::Ok);

        let store = connect(&format!("127.0.0.1:{}", tcp_port)).await.unwrap();
        assert_eq!(store.insert("via-tcp", b"2").await.unwrap().status, Status::Ok);
        assert_eq!(store.select("via-udp").await.unwrap().value, b"1");

        assert_eq!(d.store().get("via-tcp"), Some(b"2".to_vec()));
        assert!(matches!(connect("http://127.0.0.1:1").await, Err(Error::InvalidEndpoint(_))));
    }

    #[tokio::test]
    async fn test_from_env() {
        let d = dispatcher();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let tcp = TcpServer::new(d.clone());
        tokio::spawn(async move { tcp.serve(&listener).await });

        env::set_var(ADDR_ENV, format!("tcp://127.0.0.1:{}", port));
        let store = from_env().await.unwrap();
        env::remove_var(ADDR_ENV);

        assert_eq!(store.insert("env", b"v").await.unwrap().status, Status::Ok);
        assert_eq!(d.store().get("env"), Some(b"v".to_vec()));
    }
}
