//! cnirelayd - CNI relay daemon.
//!
//! Serves the relay dispatcher on two transports at once: a local unix
//! socket and a TCP endpoint. Both listeners share one stateless
//! dispatcher; losing either listener is fatal to the whole process.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_stream::wrappers::UnixListenerStream;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod grpc;
mod invoker;
mod translate;

use grpc::CniRelayService;
use invoker::ExecInvoker;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Unix socket path to listen on
    #[arg(long, default_value = "/tmp/grpc.sock")]
    socket_path: PathBuf,

    /// TCP address to listen on
    #[arg(long, default_value = "127.0.0.1:7777")]
    tcp_addr: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let invoker = Arc::new(ExecInvoker::from_env());
    let service = CniRelayService::new(invoker);

    // Remove a stale socket left by a previous run.
    match std::fs::remove_file(&args.socket_path) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            anyhow::bail!("failed to remove stale socket {}: {err}", args.socket_path.display())
        }
    }
    let uds = tokio::net::UnixListener::bind(&args.socket_path)?;

    let unix_service = service.clone();
    let socket_path = args.socket_path.clone();
    let unix_handle = tokio::spawn(async move {
        tracing::info!("unix socket listener on {}", socket_path.display());
        tonic::transport::Server::builder()
            .add_service(unix_service.into_server())
            .serve_with_incoming(UnixListenerStream::new(uds))
            .await
    });

    let tcp_addr = args.tcp_addr;
    let tcp_handle = tokio::spawn(async move {
        tracing::info!("tcp listener on {}", tcp_addr);
        tonic::transport::Server::builder()
            .add_service(service.into_server())
            .serve(tcp_addr)
            .await
    });

    tracing::info!(
        "cnirelayd started - unix: {}, tcp: {}",
        args.socket_path.display(),
        args.tcp_addr
    );

    // Neither listener is allowed to stop; whichever finishes first
    // takes the process down.
    tokio::select! {
        res = unix_handle => match res? {
            Ok(()) => anyhow::bail!("unix socket listener exited unexpectedly"),
            Err(err) => anyhow::bail!("unix socket listener failed: {err}"),
        },
        res = tcp_handle => match res? {
            Ok(()) => anyhow::bail!("tcp listener exited unexpectedly"),
            Err(err) => anyhow::bail!("tcp listener failed: {err}"),
        },
    }
}
