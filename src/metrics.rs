#[derive(Debug, Clone)]
pub struct Metrics {
    pub responses: prometheus::IntCounterVec,
    pub upstream_latency: prometheus::Histogram,
    pub items_returned: prometheus::Histogram,
}

impl Metrics {
    pub fn new(registry: &prometheus::Registry) -> Result<Self, prometheus::Error> {
        let responses = prometheus::IntCounterVec::new(
            prometheus::Opts::new("lookup_responses_total", "Lookup responses by HTTP status"),
            &["status"],
        )?;
        registry.register(Box::new(responses.clone()))?;

        let upstream_latency = prometheus::Histogram::with_opts(prometheus::HistogramOpts::new(
            "upstream_request_seconds",
            "Duration of calls to the eBay Finding API (in seconds)",
        ))?;
        registry.register(Box::new(upstream_latency.clone()))?;

        let items_returned = prometheus::Histogram::with_opts(
            prometheus::HistogramOpts::new(
                "lookup_items_returned",
                "The number of sold prices returned per successful lookup",
            )
            .buckets(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]),
        )?;
        registry.register(Box::new(items_returned.clone()))?;

        Ok(Self {
            responses,
            upstream_latency,
            items_returned,
        })
    }

    pub fn record_response(&self, status: axum::http::StatusCode) {
        self.responses
            .with_label_values(&[status.as_str()])
            .inc();
    }
}

/// Prometheus text exposition of everything registered on `registry`.
#[tracing::instrument(skip(registry))]
pub async fn render(
    axum::extract::State(registry): axum::extract::State<prometheus::Registry>,
) -> axum::response::Response {
    use axum::response::IntoResponse;

    let families = registry.gather();
    tracing::trace!("Rendering {} metric families", families.len());

    match prometheus::TextEncoder::new().encode_to_string(&families) {
        Ok(text) => (
            [(axum::http::header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            text,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Encoding Metrics {:?}", e);
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
