use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = runtime.block_on(soldprice::Config::load(config_path.as_deref()))?;

    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(config.log_level())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!("Starting");
    if config.app_id.is_none() {
        tracing::warn!(
            "{} is not set, lookups will fail",
            soldprice::config::APP_ID_VAR
        );
    }

    let registry = prometheus::Registry::new();
    let state = soldprice::AppState::new(&config, registry)?;
    let app = soldprice::router(state);

    runtime.block_on(async move {
        tracing::info!("Listening on {}", config.listen);

        axum::Server::try_bind(&config.listen)?
            .serve(app.into_make_service())
            .with_graceful_shutdown(async {
                tokio::signal::ctrl_c().await.ok();
                tracing::info!("Shutting down");
            })
            .await
    })?;

    Ok(())
}
