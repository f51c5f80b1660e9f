//! switchboard - HTTP reverse-proxy load balancer
//!
//! Accepts inbound HTTP requests on a listening port and forwards each to
//! one of a configured set of upstream backends, continuously probing
//! liveness and retrying bounded alternates before giving up with a `502`.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use log::{error, info};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

mod backend;
mod balancer;
mod cli;
mod config;
mod constants;
mod error;
mod health;
mod logging;
mod pool;
mod proxy;

use balancer::Balancer;
use cli::Cli;
use config::Config;
use health::HealthProber;
use proxy::BufferedRequest;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging(&std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))?;

    let cli = Cli::parse_args();
    info!("{} v{} starting", constants::APP_NAME, constants::VERSION);

    let config = Config::load_from_file(&cli.config)
        .await
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    info!(
        "configuration loaded: {} (port {}, {} backend(s), policy {:?})",
        cli.config.display(),
        config.port,
        config.backends.len(),
        config.pool_kind
    );

    let port = config.port;
    let balancer = Arc::new(Balancer::new(config));

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let health_balancer = Arc::clone(&balancer);
    let health_shutdown = shutdown_tx.subscribe();
    let health_handle = tokio::spawn(async move {
        HealthProber::new(health_balancer).run(health_shutdown).await;
    });

    let listen_addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to port {}", port))?;
    info!("switchboard listening on {}", listen_addr);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let balancer = Arc::clone(&balancer);
                        tokio::spawn(async move {
                            serve_connection(stream, peer, balancer).await;
                        });
                    }
                    Err(err) => error!("failed to accept connection: {}", err),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("SIGINT received, shutting down");
                break;
            }
        }
    }

    let _ = shutdown_tx.send(());
    if let Err(err) = health_handle.await {
        error!("health prober task panicked: {}", err);
    }

    info!("switchboard shutdown complete");
    Ok(())
}

/// Serve one accepted TCP connection as HTTP/1.1, dispatching every request
/// on it through the balancer.
async fn serve_connection(stream: tokio::net::TcpStream, peer: SocketAddr, balancer: Arc<Balancer>) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req| {
        let balancer = Arc::clone(&balancer);
        async move { Ok::<_, Infallible>(dispatch(req, balancer).await) }
    });

    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
        log::debug!("connection with {} ended: {}", peer, err);
    }
}

/// Buffer the inbound request body once, then hand it to the balancer's
/// pick-and-dispatch retry loop.
async fn dispatch(
    req: http::Request<hyper::body::Incoming>,
    balancer: Arc<Balancer>,
) -> http::Response<BoxBody<Bytes, hyper::Error>> {
    match BufferedRequest::buffer(req).await {
        Ok(buffered) => balancer.handle_request(&buffered).await,
        Err(err) => {
            error!("failed to read request body: {}", err);
            proxy::bad_gateway()
        }
    }
}
