use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::ebay::{self, FindingQuery, PriceResult};
use crate::{AppState, LookupError};

#[derive(Debug, Clone, PartialEq)]
pub struct LookupRequest {
    pub query: String,
    pub site: String,
}

impl LookupRequest {
    /// Picks `q` and `site` out of the query string. A repeated parameter is
    /// joined with commas (`q=a&q=b` is `"a,b"`).
    pub fn from_params(params: &[(String, String)]) -> Result<Self, LookupError> {
        let param = |name: &str| {
            let values: Vec<&str> = params
                .iter()
                .filter(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
                .collect();
            values.join(",")
        };

        let query = param("q");
        let query = query.trim();
        if query.is_empty() {
            return Err(LookupError::MissingQuery);
        }

        let site = match param("site") {
            site if !site.is_empty() => site.to_uppercase(),
            _ => "US".to_string(),
        };

        Ok(Self {
            query: query.to_string(),
            site,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ItemsBody {
    pub items: Vec<PriceResult>,
}

fn with_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

/// Answers with up to five recent sold prices for `q`.
#[tracing::instrument(skip_all, fields(method = %method))]
pub async fn sold_prices(
    State(state): State<AppState>,
    method: Method,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let response = if method == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        match lookup(&state, &params).await {
            Ok(items) => {
                state.metrics.items_returned.observe(items.len() as f64);
                (StatusCode::OK, Json(ItemsBody { items })).into_response()
            }
            Err(e) => {
                tracing::warn!("Lookup failed: {}", e);
                e.into_response()
            }
        }
    };

    state.metrics.record_response(response.status());
    with_cors(response)
}

async fn lookup(
    state: &AppState,
    params: &[(String, String)],
) -> Result<Vec<PriceResult>, LookupError> {
    let app_id = state
        .app_id
        .as_deref()
        .ok_or(LookupError::MissingCredential)?;

    let request = LookupRequest::from_params(params)?;
    tracing::info!(query = %request.query, site = %request.site, "Looking up sold prices");

    let query = FindingQuery::new(app_id, &request.query, &request.site);

    let timer = state.metrics.upstream_latency.start_timer();
    let body = state.client.find_completed_items(&query).await;
    timer.observe_duration();

    let items = ebay::extract_prices(&body?, ebay::MAX_RESULTS);
    tracing::info!("Found {} prices", items.len());

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn trims_query_and_defaults_site() {
        let request = LookupRequest::from_params(&params(&[("q", "  vintage camera ")])).unwrap();

        assert_eq!(
            request,
            LookupRequest {
                query: "vintage camera".to_string(),
                site: "US".to_string(),
            }
        );
    }

    #[test]
    fn uppercases_site() {
        let request = LookupRequest::from_params(&params(&[("site", "gb"), ("q", "lens")])).unwrap();

        assert_eq!(request.site, "GB");
    }

    #[test]
    fn empty_query_is_rejected() {
        for q in [&params(&[]), &params(&[("q", "")]), &params(&[("q", " \t ")])] {
            assert_eq!(LookupRequest::from_params(q), Err(LookupError::MissingQuery));
        }
    }

    #[test]
    fn repeated_params_are_joined() {
        let request = LookupRequest::from_params(&params(&[
            ("q", "one"),
            ("site", "us"),
            ("q", "two"),
            ("site", "gb"),
        ]))
        .unwrap();

        assert_eq!(request.query, "one,two");
        assert_eq!(request.site, "US,GB");
    }

    #[test]
    fn cors_headers() {
        let response = with_cors(StatusCode::NO_CONTENT.into_response());

        let headers = response.headers();
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(headers["access-control-allow-methods"], "GET, OPTIONS");
        assert_eq!(headers["access-control-allow-headers"], "Content-Type");
    }
}
