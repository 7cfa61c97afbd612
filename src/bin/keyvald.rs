use std::sync::Arc;
use clap::Parser;
use env_logger::Env;
use keyval::engine::{PartitionedStore, DEFAULT_SHARDS};
use keyval::protocol::Dispatcher;
use keyval::server::{
    parse_endpoint, HttpServer, TcpServer, Transport, UdpServer, DEFAULT_HTTP_ADDR,
    DEFAULT_HTTP_PORT, DEFAULT_TCP_ADDR, DEFAULT_TCP_PORT, DEFAULT_UDP_ADDR, DEFAULT_UDP_PORT,
};
use log::{debug, error, info, warn};
use tokio::net::{TcpListener, UdpSocket};
use tokio::signal;

#[derive(Parser, Debug)]
#[command(author, version, about = "Keyval store daemon", long_about = None)]
struct Args {
    /// Listen address for the HTTP API
    #[arg(long)]
    http: Option<String>,

    /// Listen address for the TCP API
    #[arg(long)]
    tcp: Option<String>,

    /// Listen address for the UDP API
    #[arg(long)]
    udp: Option<String>,

    /// Number of store buckets
    #[arg(short, long)]
    shards: Option<usize>,

    /// Debug logging
    #[arg(short, long)]
    debug: bool,
}

fn setting(flag: Option<String>, var: &str, default: &str) -> String {
    flag.or_else(|| std::env::var(var).ok())
        .unwrap_or_else(|| default.to_string())
}

fn exited(name: &str, res: keyval::Result<()>) -> anyhow::Error {
    match res {
        Ok(()) => anyhow::anyhow!("{} API exited", name),
        Err(e) => anyhow::Error::from(e).context(format!("{} API failed", name)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let http_addr = parse_endpoint(
        &setting(args.http, "KEYVAL_HTTP_ADDR", DEFAULT_HTTP_ADDR),
        Transport::Tcp,
        DEFAULT_HTTP_PORT,
    )?;
    let tcp_addr = parse_endpoint(
        &setting(args.tcp, "KEYVAL_TCP_ADDR", DEFAULT_TCP_ADDR),
        Transport::Tcp,
        DEFAULT_TCP_PORT,
    )?;
    let udp_addr = parse_endpoint(
        &setting(args.udp, "KEYVAL_UDP_ADDR", DEFAULT_UDP_ADDR),
        Transport::Udp,
        DEFAULT_UDP_PORT,
    )?;
    let listeners = [
        ("http", &http_addr, Transport::Tcp),
        ("tcp", &tcp_addr, Transport::Tcp),
        ("udp", &udp_addr, Transport::Udp),
    ];
    for (name, endpoint, expected) in listeners {
        if endpoint.transport != expected {
            anyhow::bail!("{} API must listen on {}, got {}", name, expected, endpoint);
        }
    }

    let shards = match args.shards {
        Some(shards) => shards,
        None => match std::env::var("KEYVAL_SHARDS") {
            Ok(raw) => raw.parse()?,
            Err(_) => DEFAULT_SHARDS,
        },
    };

    let store = Arc::new(PartitionedStore::new(shards));
    let dispatcher = Arc::new(Dispatcher::new(store.clone()));
    info!("Store started with {} buckets", store.shard_count());

    let http_listener = TcpListener::bind(&http_addr.addr).await?;
    let tcp_listener = TcpListener::bind(&tcp_addr.addr).await?;
    let udp_socket = Arc::new(UdpSocket::bind(&udp_addr.addr).await?);
    debug!("API http://{} {} {}", http_addr.addr, tcp_addr, udp_addr);

    let http = HttpServer::new(dispatcher.clone());
    let tcp = TcpServer::new(dispatcher.clone());
    let udp = Arc::new(UdpServer::new(dispatcher));

    let mut udp_task = {
        let udp = udp.clone();
        let socket = udp_socket.clone();
        tokio::spawn(async move { udp.serve(socket).await })
    };

    // Whichever adapter fails first takes the others down with it.
    let outcome = tokio::select! {
        res = http.serve(http_listener) => Err(exited("HTTP", res)),
        res = tcp.serve(&tcp_listener) => Err(exited("TCP", res)),
        res = &mut udp_task => match res {
            Ok(res) => Err(exited("UDP", res)),
            Err(e) => Err(anyhow::Error::from(e).context("UDP API panicked")),
        },
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
            Ok(())
        }
    };

    if !udp_task.is_finished() {
        // The loop may exit on its own before the request lands; its result says why.
        if let Err(e) = udp.stop().await {
            warn!("UDP stop handshake failed: {}", e);
        }
        udp_task.await??;
    }

    match outcome {
        Ok(()) => {
            info!("Shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("Server failed: {}", e);
            Err(e)
        }
    }
}
