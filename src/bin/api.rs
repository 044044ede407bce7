use dotenvy::dotenv;
use std::net::SocketAddr;
use tracing::{info, warn};

use marketplace_admin::{
    api::{router, AppState},
    config::AdminConfig,
    logging::init_tracing,
    services::{http::HttpBackend, InMemoryBackend},
};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing();

    let config = AdminConfig::from_env();
    let app = match &config.backend_url {
        Some(url) => {
            info!(backend = %url, "proxying marketplace API");
            let backend = HttpBackend::new(url, config.http_timeout)
                .expect("failed to build marketplace API client");
            router(AppState::new(backend))
        }
        None => {
            warn!("ADMIN_API_BASE_URL not set, serving built-in sample data");
            router(AppState::new(InMemoryBackend::new_with_sample()))
        }
    };

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .expect("invalid BIND_ADDR, expected host:port");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind HTTP listener");
    info!("admin API listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server crashed");
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    }
}
