/// Software Development Kit (SDK) for Keyval.
///
/// Clients for the two binary transports and endpoint-based client selection.
pub mod client;
/// Endpoint parsing and client selection.
pub mod discovery;

pub use client::{RemoteStore, TcpClient, UdpClient};
pub use discovery::{connect, from_env};
