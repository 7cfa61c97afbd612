use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use log::{debug, error, info, warn};
use crate::protocol::{decode_query, encode_result, Dispatcher, Query, QueryResult};
use crate::{Error, Result};

/// Largest datagram read or written by the adapter.
pub const MAX_DATAGRAM_SIZE: usize = 1024;
/// Decoded queries waiting for the consumer.
pub const QUEUE_CAPACITY: usize = 100;

struct Inbound {
    query: Query,
    addr: SocketAddr,
}

type StopAck = oneshot::Sender<()>;
type ControlSlot = Mutex<Option<mpsc::Sender<StopAck>>>;

/// Connectionless binary adapter.
///
/// One task reads datagrams. Each decoded query is pushed onto a bounded
/// queue by its own short-lived task, so a full queue never stalls the read
/// loop. A single consumer drains the queue, dispatches, and is the only
/// writer of responses for dispatched queries. Responses follow enqueue
/// order, which is not necessarily arrival order.
pub struct UdpServer {
    dispatcher: Arc<Dispatcher>,
    /// Control sender of the running serve loop, if any.
    control: ControlSlot,
}

/// Clears the control slot when a serve loop ends, however it ends.
struct Serving<'a>(&'a ControlSlot);

impl Drop for Serving<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl UdpServer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            control: Mutex::new(None),
        }
    }

    /// Serves datagrams until [`stop`](Self::stop) is called or the socket fails.
    ///
    /// The socket is never closed here; the caller keeps its own handle.
    pub async fn serve(&self, socket: Arc<UdpSocket>) -> Result<()> {
        let (control_tx, mut control) = mpsc::channel::<StopAck>(1);
        let serving = {
            let mut slot = self.control.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_some() {
                return Err(Error::Internal("udp adapter is already serving".to_string()));
            }
            *slot = Some(control_tx);
            Serving(&self.control)
        };
        info!("UDP adapter listening on {}", socket.local_addr()?);

        let (queue_tx, queue_rx) = mpsc::channel(QUEUE_CAPACITY);
        let mut consumer: JoinHandle<Result<()>> =
            tokio::spawn(consume(queue_rx, socket.clone(), self.dispatcher.clone()));

        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let ack = loop {
            tokio::select! {
                Some(ack) = control.recv() => {
                    // The caller gave up waiting; nobody to answer.
                    if ack.is_closed() {
                        debug!("ignoring abandoned udp stop request");
                        continue;
                    }
                    break ack;
                }
                finished = &mut consumer => {
                    return Err(join_error(finished).unwrap_or_else(|| {
                        Error::Internal("udp consumer exited unexpectedly".to_string())
                    }));
                }
                received = socket.recv_from(&mut buf) => {
                    let (len, addr) = match received {
                        Ok(received) => received,
                        // An earlier reply hit a closed port (reported on some platforms).
                        Err(e) if e.kind() == ErrorKind::ConnectionReset => {
                            debug!("ignoring connection reset on udp socket");
                            continue;
                        }
                        Err(e) => {
                            consumer.abort();
                            return Err(e.into());
                        }
                    };

                    match decode_query(&buf[..len]) {
                        Ok(query) => {
                            let queue_tx = queue_tx.clone();
                            tokio::spawn(async move {
                                if queue_tx.send(Inbound { query, addr }).await.is_err() {
                                    debug!("udp queue closed, dropping query from {}", addr);
                                }
                            });
                        }
                        Err(e) => {
                            warn!("Undecodable datagram from {}: {}", addr, e);
                            if let Err(e) = reply_server_error(&socket, addr).await {
                                consumer.abort();
                                return Err(e);
                            }
                        }
                    }
                }
            }
        };

        // Let the consumer drain everything already accepted before acknowledging.
        drop(queue_tx);
        if let Some(e) = join_error(consumer.await) {
            return Err(e);
        }
        drop(serving);
        let _ = ack.send(());
        info!("UDP adapter stopped");
        Ok(())
    }

    /// Asks the running serve loop to stop and waits until it has exited.
    ///
    /// The socket handed to `serve` stays open. Fails with
    /// [`Error::NotServing`] when no serve loop is running, or when the loop
    /// exits on its own before acknowledging.
    pub async fn stop(&self) -> Result<()> {
        let control = self
            .control
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::NotServing)?;

        let (ack_tx, ack_rx) = oneshot::channel();
        control.send(ack_tx).await.map_err(|_| Error::NotServing)?;
        ack_rx.await.map_err(|_| Error::NotServing)
    }
}

/// Sole writer of dispatched responses.
async fn consume(
    mut queue: mpsc::Receiver<Inbound>,
    socket: Arc<UdpSocket>,
    dispatcher: Arc<Dispatcher>,
) -> Result<()> {
    while let Some(Inbound { query, addr }) = queue.recv().await {
        debug!("udp {:?} {} from {}", query.method, query.key, addr);
        let result = dispatcher.dispatch(query);

        let mut reply = encode_result(&result)?;
        if reply.len() > MAX_DATAGRAM_SIZE {
            warn!("Response for {} is {} bytes, over the datagram limit", addr, reply.len());
            reply = encode_result(&QueryResult::server_error())?;
        }

        // A failed write is not retried; it takes the adapter down.
        if let Err(e) = socket.send_to(&reply, addr).await {
            error!("Failed to answer {}: {}", addr, e);
            return Err(e.into());
        }
    }
    Ok(())
}

/// Answers an undecodable datagram straight from the read loop, bypassing the queue.
async fn reply_server_error(socket: &UdpSocket, addr: SocketAddr) -> Result<()> {
    let reply = encode_result(&QueryResult::server_error())?;
    socket.send_to(&reply, addr).await?;
    Ok(())
}

fn join_error(finished: std::result::Result<Result<()>, tokio::task::JoinError>) -> Option<Error> {
    match finished {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e),
        Err(e) => Some(Error::Internal(format!("udp consumer task failed: {}", e))),
    }
}
