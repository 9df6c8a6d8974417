extern crate rs_core;

use engine::Engine;
use recordsync::http;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const DEFAULT_TOPOLOGY_PATH: &str = "topology.json";
const DEFAULT_RULES_PATH: &str = "rules.json";
const DEFAULT_PORT: u16 = 2666;

#[tokio::main]
async fn main() {
    setup_logging();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let topology_path = args.next().unwrap_or_else(|| DEFAULT_TOPOLOGY_PATH.to_string());
    let rules_path = args.next().unwrap_or_else(|| DEFAULT_RULES_PATH.to_string());

    let engine = match Engine::start(&config_path, &topology_path, &rules_path).await {
        Ok(engine) => engine,
        Err(err) => {
            tracing::error!(%err, "failed to start engine");
            std::process::exit(1);
        }
    };

    let app = http::router(engine.clone()).layer(CorsLayer::permissive());

    // Could also read our port in from the environment as well.
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%err, %addr, "unable to bind http listener");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "recordsync listening");

    let shutdown_engine = engine.clone();
    let shutdown = async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
        shutdown_engine.shutdown().await;
    };

    if let Err(err) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
        tracing::error!(%err, "http server error");
    }
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
