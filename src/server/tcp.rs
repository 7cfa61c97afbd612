use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use log::{debug, error, info, warn};
use crate::protocol::{
    decode_query, encode_result, read_frame, write_frame, Dispatcher, QueryResult,
};
use crate::Result;

/// Connection-oriented binary adapter.
///
/// Every accepted connection gets its own task and carries exactly one
/// query/result exchange before it is closed.
pub struct TcpServer {
    dispatcher: Arc<Dispatcher>,
}

impl TcpServer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Accepts connections until the listener fails. The listener stays owned
    /// by the caller; dropping this future stops accepting.
    pub async fn serve(&self, listener: &TcpListener) -> Result<()> {
        info!("TCP adapter listening on {}", listener.local_addr()?);

        loop {
            let (socket, peer) = listener.accept().await?;
            let dispatcher = self.dispatcher.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(socket, dispatcher).await {
                    error!("Connection error from {}: {}", peer, e);
                }
            });
        }
    }
}

/// Runs the single exchange of one connection, then shuts it down.
pub async fn handle_connection(mut socket: TcpStream, dispatcher: Arc<Dispatcher>) -> Result<()> {
    let decoded = match read_frame(&mut socket).await {
        Ok(frame) => decode_query(&frame),
        Err(e) => Err(e),
    };

    let result = match decoded {
        Ok(query) => {
            debug!("tcp {:?} {}", query.method, query.key);
            dispatcher.dispatch(query)
        }
        Err(e) => {
            warn!("Undecodable query: {}", e);
            QueryResult::server_error()
        }
    };

    let bytes = encode_result(&result)?;
    write_frame(&mut socket, &bytes).await?;
    socket.shutdown().await?;
    Ok(())
}
