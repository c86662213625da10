//! Name server coordinator binary.
//!
//! Wires together the directory tree, the storage-node registry, and the
//! HTTP command surface (`/command/`, `/connect/`) into a single Axum
//! router, then serves it until a termination signal arrives.

mod bytes;
mod command;
mod config;
mod coordinator;
mod error;
mod handlers;
mod http;
mod logging;
mod node_client;
mod path;
mod registry;
mod tree;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::routing::{get, post};
use axum::{Extension, Router};
use clap::Parser;
use tokio::signal;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{info, info_span, Level};

use crate::config::Args;
use crate::coordinator::{Coordinator, NodeCredentials};

/// Starts the coordinator and blocks until shutdown.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    logging::init_logging();

    let args = Args::parse();

    let coordinator = Arc::new(
        Coordinator::new(
            NodeCredentials {
                ftp_username: args.ftp_username.clone(),
                ftp_password: args.ftp_password.clone(),
                ftp_tls: args.ftp_tls,
                storage_node_root: args.storage_node_root.clone(),
            },
            args.storage_node_port,
            Duration::from_secs(args.request_timeout_secs),
        )
        .await,
    );

    let app = Router::new()
        .route("/command/", get(handlers::command_get).post(handlers::command_post))
        .route("/connect/", post(handlers::connect_storage_server))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    info_span!(
                        env!("CARGO_CRATE_NAME"),
                        method = ?request.method(),
                        path = ?request.uri().path(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(Extension(coordinator));

    let host = args
        .bind
        .parse::<IpAddr>()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;
    let addr = SocketAddr::new(host, args.port);

    info!("starting name server coordinator at {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("received termination signal, shutting down");
}
