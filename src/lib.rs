use std::sync::Arc;

pub mod config;
pub mod ebay;
pub mod lookup;
pub mod metrics;

mod error;
pub use error::LookupError;
pub use metrics::Metrics;

pub use config::Config;

/// State shared by all requests. Nothing in here is mutated after startup.
#[derive(Clone)]
pub struct AppState {
    pub app_id: Option<Arc<str>>,
    pub client: Arc<ebay::Client>,
    pub metrics: Metrics,
    pub registry: prometheus::Registry,
}

impl AppState {
    pub fn new(config: &Config, registry: prometheus::Registry) -> Result<Self, prometheus::Error> {
        let metrics = Metrics::new(&registry)?;

        Ok(Self {
            app_id: config.app_id.as_deref().map(Arc::from),
            client: Arc::new(ebay::Client::new(config.endpoint.clone(), config.timeout())),
            metrics,
            registry,
        })
    }
}

impl axum::extract::FromRef<AppState> for prometheus::Registry {
    fn from_ref(state: &AppState) -> Self {
        state.registry.clone()
    }
}

pub fn router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/", axum::routing::any(lookup::sold_prices))
        .route("/api/ebay-sold", axum::routing::any(lookup::sold_prices))
        .route("/metrics", axum::routing::get(metrics::render))
        .with_state(state)
}
