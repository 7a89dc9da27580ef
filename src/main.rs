use axum::{routing::get, Router};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use whois_gateway::{
    cache::{Cache, FallbackCache, MemoryCache, RedisCache},
    config::Config,
    handlers::{self, AppState},
    limiter::AdmissionControl,
    metrics,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "whois_gateway=info,tower_http=warn".into()),
        )
        .init();

    let config = Arc::new(Config::load()?);
    info!("Configuration loaded successfully");

    let redis_cache =
        RedisCache::new(&config.redis_addr, &config.redis_password, config.redis_db).await?;
    let memory_cache = MemoryCache::new(config.memory_max_size, config.memory_clean_interval);

    if redis_cache.is_healthy() {
        info!("Redis cache initialized successfully");
    } else {
        warn!("Redis unavailable, using memory cache as fallback");
        if config.require_redis {
            return Err(
                "Redis is required but unavailable. Set cache.requireredis to false to allow fallback."
                    .into(),
            );
        }
    }
    info!(
        "Cache configuration: max memory entries={}, clean interval={:?}",
        config.memory_max_size, config.memory_clean_interval
    );

    let cache = FallbackCache::new(redis_cache, memory_cache);
    let admission = AdmissionControl::new(config.rate_limit);

    metrics::init_metrics();

    let state = AppState {
        config: config.clone(),
        cache,
        admission: admission.clone(),
    };

    let app = Router::new()
        .route("/health", get(handlers::handle_health))
        .route("/ready", get(handlers::handle_ready))
        .route("/info", get(handlers::handle_info))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/:identifier", get(handlers::handle_lookup))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .into_inner(),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("whois-gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The listener has stopped accepting; wait for admitted requests, but
    // not forever: a wedged upstream should not wedge the shutdown.
    info!("Received shutdown signal, waiting for all queries to complete...");
    if admission.drain(config.shutdown_timeout).await {
        info!("All queries completed. Shutting down.");
    } else {
        warn!(
            "Drain deadline of {:?} elapsed with requests still in flight, shutting down anyway",
            config.shutdown_timeout
        );
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
