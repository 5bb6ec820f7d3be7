//! Lead Prospecting Dashboard — Binary Entrypoint
//! Boots the Axum HTTP server: config, lead store, campaign runner,
//! Prometheus metrics and the static dashboard page.
//!
//! See `README.md` for quickstart.

use tracing_subscriber::EnvFilter;

use prospect_dashboard::api::{create_router, AppState};
use prospect_dashboard::campaign::CampaignRunner;
use prospect_dashboard::config::Config;
use prospect_dashboard::loader::{self, LeadStore};
use prospect_dashboard::metrics::Metrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    dotenvy::dotenv().ok();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = Config::load();
    let metrics = Metrics::init();

    // First load before accepting traffic. The fallback chain bottoms out
    // at built-in samples, so this always yields rows.
    let outcome = loader::load(&config).await;
    tracing::info!(
        total = outcome.leads.len(),
        source = %outcome.source_label,
        status = ?outcome.status,
        "initial lead collection ready"
    );

    let store = LeadStore::new(outcome);
    let campaign = CampaignRunner::new(&config, store.clone());
    let state = AppState::new(config.clone(), store, campaign);

    let app = create_router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
