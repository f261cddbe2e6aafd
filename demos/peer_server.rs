//! Three cache nodes in one process, each serving its peers over HTTP with
//! axum.
//!
//! ```sh
//! RUST_LOG=peercache=debug cargo run --example peer_server
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use peercache::config::{GroupConfig, PeerPoolConfig};
use peercache::group::getter_fn;
use peercache::{Group, PeerPool, Registry};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const NODES: usize = 3;

fn scores() -> [(&'static str, &'static str); 3] {
    [("Tom", "630"), ("Jack", "589"), ("Sam", "567")]
}

/// Hands every request path to the pool. The pool may block on the origin or
/// on another peer, so it runs off the async workers.
async fn serve_peer(State(pool): State<Arc<PeerPool>>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    match tokio::task::spawn_blocking(move || pool.handle(&path)).await {
        Ok(response) => (
            StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            [(header::CONTENT_TYPE, response.content_type)],
            response.body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

fn start_node(url: &str, peers: &[String]) -> Result<(Arc<Group>, Arc<PeerPool>), peercache::Error> {
    let registry = Arc::new(Registry::new());
    let owner = url.to_string();
    let group = registry.new_group(
        GroupConfig {
            cache_bytes: 2 << 10,
            ..GroupConfig::new("scores")
        },
        getter_fn(move |key| {
            info!(node = %owner, key, "searching origin");
            scores()
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, score)| score.as_bytes().to_vec())
                .ok_or_else(|| format!("{key} not exist").into())
        }),
    )?;

    let pool = Arc::new(PeerPool::new(
        PeerPoolConfig {
            timeout: Some(Duration::from_secs(2)),
            ..PeerPoolConfig::new(url)
        },
        registry,
    ));
    pool.set_peers(peers.iter().cloned());
    group.register_peers(pool.clone())?;
    Ok((group, pool))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut listeners = Vec::with_capacity(NODES);
    for _ in 0..NODES {
        listeners.push(TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?);
    }
    let urls = listeners
        .iter()
        .map(|listener| Ok(format!("http://{}", listener.local_addr()?)))
        .collect::<std::io::Result<Vec<_>>>()?;

    let mut groups = Vec::with_capacity(NODES);
    for (listener, url) in listeners.into_iter().zip(&urls) {
        let (group, pool) = start_node(url, &urls)?;
        let app = Router::new().fallback(serve_peer).with_state(pool);
        tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                warn!(error = %err, "peer server stopped");
            }
        });
        info!(node = %url, "peer server listening");
        groups.push(group);
    }

    let client = Arc::clone(&groups[0]);
    let lookups = tokio::task::spawn_blocking(move || {
        ["Tom", "Jack", "Sam", "Tom", "Kate"]
            .into_iter()
            .map(|key| (key, client.get(key)))
            .collect::<Vec<_>>()
    })
    .await?;
    for (key, result) in lookups {
        match result {
            Ok(value) => println!("{key} = {value}"),
            Err(err) => println!("{key}: {err}"),
        }
    }

    for (url, group) in urls.iter().zip(&groups) {
        println!("{url} {:?}", group.stats().to_btreemap());
    }
    Ok(())
}
