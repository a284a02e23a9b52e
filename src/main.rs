use std::net::SocketAddr;
use std::sync::Arc;

use swapstats::engine::{LogBroadcast, NoopTrustHook, Responder, SwapTracker, SymbolRegistry};
use swapstats::{api, config::Config, EventLog};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    let log = Arc::new(EventLog::new(&config.stats_log_path));
    let registry = Arc::new(SymbolRegistry::new());
    let tracker = SwapTracker::new(
        config.settlement.clone(),
        registry,
        Arc::new(NoopTrustHook),
    );
    let responder = Arc::new(Responder::new(
        log,
        tracker,
        Arc::new(LogBroadcast),
        config.screen_width,
    ));

    // Create router
    let app = api::create_router(api::AppState::new(responder));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Swap stats server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
