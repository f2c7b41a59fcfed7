// Bet Ledger - Main Entry Point

use std::sync::Arc;

use bet_ledger::{app, logging, AppState, Config, SharedState};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    logging::init_logging(&config);

    let addr = config.bind_addr;
    let state: SharedState = match AppState::open(config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!(error = %e, "failed to open ledger state");
            std::process::exit(1);
        }
    };
    let shutdown_state = state.clone();

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!(%addr, "bet ledger listening");
    tracing::info!("endpoints: /bets, /bets/:id, /bets/:id/result, /settings, /convert, /reports/*, /health");

    let server = axum::serve(listener, app(state)).with_graceful_shutdown(shutdown_signal());
    if let Err(e) = server.await {
        tracing::error!(error = %e, "server error");
    }

    match shutdown_state.flush() {
        Ok(bytes) => tracing::info!(bytes, "ledger flushed to disk"),
        Err(e) => tracing::error!(error = %e, "failed to flush ledger"),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
