use std::sync::Arc;

use axum::{error_handling::HandleErrorLayer, http::StatusCode};
use tower::{BoxError, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use telehealth_booking::{
    create_router,
    services::{
        connectivity::{spawn_heartbeat, BroadcastPushChannel, ConnectivityMonitor},
        sessions::{spawn_session_sweeper, SessionRegistry},
    },
    AppState, PortalClient, PortalConfig, SessionSigner,
};

// Error handler
async fn handle_error(error: BoxError) -> (StatusCode, String) {
    if error.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            "Request took too long".to_string(),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Unhandled internal error: {}", error),
        )
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match PortalConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    #[cfg(feature = "sentry-monitoring")]
    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        info!("Sentry error tracking enabled");
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    // Initialize the portal backend client
    let client = PortalClient::new(&config.api_base_url, config.request_timeout)
        .expect("Failed to build HTTP client");

    // Live-update channel: the heartbeat publishes, the monitor listens
    let channel = Arc::new(BroadcastPushChannel::new(16));
    let connectivity = Arc::new(ConnectivityMonitor::new());
    connectivity
        .attach(channel.clone())
        .await
        .expect("Failed to subscribe to push channel");
    let heartbeat = spawn_heartbeat(client.clone(), channel, config.heartbeat_interval);
    info!("Connectivity monitor attached to backend heartbeat");

    let sessions = Arc::new(SessionRegistry::new(
        Arc::new(client),
        SessionSigner::new(&config.session_signing_key),
    ));
    let sweeper = spawn_session_sweeper(
        Arc::clone(&sessions),
        config.session_idle_timeout,
        config.session_idle_timeout / 4,
    );
    info!(
        "Sessions expire after {:?} without activity",
        config.session_idle_timeout
    );

    // Create shared application state
    let app_state = Arc::new(AppState {
        sessions,
        connectivity: Arc::clone(&connectivity),
    });

    let app = create_router(app_state).layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_error))
            .load_shed()
            .concurrency_limit(64)
            .timeout(config.request_timeout * 2)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::new().allow_origin(Any)),
    );

    info!("Server listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    // Set up signal handler for graceful shutdown
    let shutdown = async {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received interrupt signal, starting graceful shutdown");
            },
            _ = terminate => {
                info!("Received terminate signal, starting graceful shutdown");
            },
        }
    };

    info!("Server is ready to accept connections");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .expect("Failed to start server");

    heartbeat.abort();
    sweeper.abort();
    connectivity.detach().await;
    info!("Server has been gracefully shut down");
}
