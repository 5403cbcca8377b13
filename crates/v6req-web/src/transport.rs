//! HTTP transport
//!
//! Serves the page on `GET /` and `POST /` and shuts down gracefully. Once
//! the shutdown signal fires the listener stops accepting and in-flight
//! requests get a grace period. Connections still open after that are
//! closed.

use crate::render::render_page;
use crate::{client_ip, Orchestrator, Result, WebError};
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Request};
use axum::response::Html;
use axum::routing::get;
use axum::{Form, Router};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use serde::Deserialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tower_service::Service;

/// Submitted form
#[derive(Debug, Deserialize)]
struct AsnForm {
    #[serde(default)]
    asn: String,
}

/// Build the router
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/", get(index).post(submit))
        .with_state(orchestrator)
}

async fn index(
    State(orchestrator): State<Arc<Orchestrator>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Html<String> {
    let ip = client_ip(&headers, Some(peer));
    let page = orchestrator.handle(ip, None).await;
    Html(render_page(&page))
}

async fn submit(
    State(orchestrator): State<Arc<Orchestrator>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Form(form): Form<AsnForm>,
) -> Html<String> {
    let ip = client_ip(&headers, Some(peer));
    let page = orchestrator.handle(ip, Some(&form.asn)).await;
    Html(render_page(&page))
}

/// Bind `addr` and serve until `shutdown` resolves
pub async fn serve<F>(
    orchestrator: Arc<Orchestrator>,
    addr: SocketAddr,
    grace: Duration,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| WebError::Bind { addr, source })?;
    serve_listener(listener, orchestrator, grace, shutdown).await
}

/// Serve on an already bound listener until `shutdown` resolves
///
/// Each connection runs in a task owned by this function. After `shutdown`
/// the listener is closed and open connections are asked to finish their
/// current request; any still open once `grace` elapses are aborted, which
/// closes their sockets.
pub async fn serve_listener<F>(
    listener: TcpListener,
    orchestrator: Arc<Orchestrator>,
    grace: Duration,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send,
{
    if let Ok(local) = listener.local_addr() {
        tracing::info!(%local, "Server listening");
    }

    let app = router(orchestrator);
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut connections = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    connections.spawn(serve_connection(stream, peer, app.clone(), stop_rx.clone()));
                }
                Err(e) => {
                    // Usually fd exhaustion
                    tracing::warn!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            _ = &mut shutdown => break,
        }
    }

    drop(listener);
    tracing::info!(grace = ?grace, open = connections.len(), "Shutting down gracefully");
    let _ = stop_tx.send(true);

    let drained = tokio::time::timeout(grace, async {
        while connections.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        tracing::warn!(
            open = connections.len(),
            "Grace period elapsed, closing remaining connections"
        );
        connections.shutdown().await;
    }
    tracing::info!("Server stopped");
    Ok(())
}

/// Drive one HTTP/1 connection, finishing early when `stop` flips
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    app: Router,
    mut stop: watch::Receiver<bool>,
) {
    let service = service_fn(move |mut request: Request<Incoming>| {
        request.extensions_mut().insert(ConnectInfo(peer));
        let mut app = app.clone();
        async move { app.call(request).await }
    });

    let connection = http1::Builder::new()
        .timer(TokioTimer::new())
        .serve_connection(TokioIo::new(stream), service);
    tokio::pin!(connection);

    tokio::select! {
        result = connection.as_mut() => {
            if let Err(e) = result {
                tracing::debug!(%peer, error = %e, "Connection closed with error");
            }
            return;
        }
        _ = stop.changed() => {}
    }

    connection.as_mut().graceful_shutdown();
    if let Err(e) = connection.await {
        tracing::debug!(%peer, error = %e, "Connection closed with error");
    }
}
