use backend_lib::{
    config::Settings,
    notify::{LogNotifier, Notifier, SmtpNotifier},
    router,
    store::FlatFileAccountStore,
    AppState,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize configuration
    // Try to load with explicit path if default doesn't work
    let settings = Settings::load().or_else(|_| Settings::load_from("config/default.toml"))?;

    // Initialize tracing; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Create the account store
    let store = Arc::new(FlatFileAccountStore::new(&settings.data_dir)?);

    // Pick the notifier: SMTP when configured, otherwise log-only
    let notifier: Arc<dyn Notifier> = match &settings.smtp {
        Some(smtp) => {
            info!(host = %smtp.host, port = smtp.port, "using SMTP notifier");
            Arc::new(SmtpNotifier::new(smtp)?)
        },
        None => {
            info!("no SMTP settings; outbound mail will be logged");
            Arc::new(LogNotifier)
        },
    };

    let bind_addr = settings.bind_addr;

    // Create application state and the router
    let state = Arc::new(AppState::new(store, notifier, settings));
    let app = router::create_router(state);

    // Start the server
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
