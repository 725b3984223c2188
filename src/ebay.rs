//! Client for the eBay Finding API, limited to sold listings of used items.

use std::time::Duration;

use serde::Serialize;

use crate::LookupError;

pub mod data;

pub const OPERATION_NAME: &str = "findCompletedItems";
pub const SERVICE_VERSION: &str = "1.13.0";
pub const ENTRIES_PER_PAGE: usize = 20;
pub const SORT_ORDER: &str = "EndTimeSoonest";

/// Maximum number of prices handed back to the caller.
pub const MAX_RESULTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceResult {
    pub title: String,
    pub price: f64,
}

/// Reasons a single upstream record does not make it into the result.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ItemError {
    #[error("Malformed record: {0}")]
    Malformed(String),
    #[error("Missing price")]
    MissingPrice,
    #[error("Unparseable price {0:?}")]
    UnparseablePrice(String),
    #[error("Currency {0} is not USD")]
    ForeignCurrency(String),
}

/// Maps the requested site onto a Finding API global id.
///
/// Only the US marketplace is supported, every other site ends up there as well.
pub fn global_id(_site: &str) -> &'static str {
    "EBAY-US"
}

#[derive(Debug, Clone, PartialEq)]
pub struct FindingQuery<'a> {
    pub app_id: &'a str,
    pub keywords: &'a str,
    pub global_id: &'static str,
}

impl<'a> FindingQuery<'a> {
    pub fn new(app_id: &'a str, keywords: &'a str, site: &str) -> Self {
        Self {
            app_id,
            keywords,
            global_id: global_id(site),
        }
    }

    /// The URL parameters in the order they are sent.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("OPERATION-NAME", OPERATION_NAME.to_string()),
            ("SERVICE-VERSION", SERVICE_VERSION.to_string()),
            ("SECURITY-APPNAME", self.app_id.to_string()),
            ("RESPONSE-DATA-FORMAT", "JSON".to_string()),
            ("REST-PAYLOAD", "true".to_string()),
            ("GLOBAL-ID", self.global_id.to_string()),
            ("keywords", self.keywords.to_string()),
            ("paginationInput.entriesPerPage", ENTRIES_PER_PAGE.to_string()),
            ("sortOrder", SORT_ORDER.to_string()),
            // Sold only + used condition
            ("itemFilter(0).name", "SoldItemsOnly".to_string()),
            ("itemFilter(0).value", "true".to_string()),
            ("itemFilter(1).name", "Condition".to_string()),
            ("itemFilter(1).value", "Used".to_string()),
        ]
    }
}

pub struct Client {
    req_client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl Client {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            req_client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            timeout,
        }
    }

    /// Runs a single search and returns the decoded response body.
    ///
    /// The deadline covers the request up until the response headers arrived.
    #[tracing::instrument(skip(self, query), fields(keywords = query.keywords))]
    pub async fn find_completed_items(
        &self,
        query: &FindingQuery<'_>,
    ) -> Result<serde_json::Value, LookupError> {
        let request = self
            .req_client
            .get(&self.endpoint)
            .query(&query.params())
            .send();

        // The URL carries SECURITY-APPNAME, so it never goes into logs or responses
        let resp = match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(r)) => r,
            Ok(Err(e)) => {
                let e = e.without_url();
                tracing::error!("Sending Request {:?}", e);
                return Err(LookupError::transport(&e));
            }
            Err(_) => {
                tracing::error!("No response within {:?}", self.timeout);
                return Err(LookupError::UpstreamTimeout);
            }
        };

        let status = resp.status();
        if !status.is_success() {
            tracing::error!("Non Success Response: {:?}", status);
            return Err(LookupError::UpstreamStatus(status.as_u16()));
        }

        resp.json().await.map_err(|e| {
            let e = e.without_url();
            tracing::error!("Deserializing Response {:?}", e);
            LookupError::transport(&e)
        })
    }
}

/// Turns one raw record into a price, or the reason it is dropped.
pub fn extract_item(raw: &serde_json::Value) -> Result<PriceResult, ItemError> {
    let item: data::RawItem =
        serde_json::from_value(raw.clone()).map_err(|e| ItemError::Malformed(e.to_string()))?;

    let title = item.title();

    let price_node = item.current_price().ok_or(ItemError::MissingPrice)?;
    let value = price_node.value_text().ok_or(ItemError::MissingPrice)?;

    let price = match parse_float_prefix(&value) {
        Some(p) if p.is_finite() => p,
        _ => return Err(ItemError::UnparseablePrice(value)),
    };

    if let Some(currency) = price_node.currency() {
        if currency != "USD" {
            return Err(ItemError::ForeignCurrency(currency.to_string()));
        }
    }

    Ok(PriceResult { title, price })
}

/// Filters the items of a search response down to USD prices and keeps the
/// first `limit` of them in upstream order.
pub fn extract_prices(body: &serde_json::Value, limit: usize) -> Vec<PriceResult> {
    data::raw_items(body)
        .iter()
        .filter_map(|raw| match extract_item(raw) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::debug!("Skipping item: {}", e);
                None
            }
        })
        .take(limit)
        .collect()
}

/// Parses the longest leading decimal number of `raw`, ignoring leading
/// whitespace and any trailing garbage (`"12.50 USD"` is `12.5`).
pub fn parse_float_prefix(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let rest = &s[end..];
    if rest.starts_with("Infinity") {
        return if s.starts_with('-') {
            Some(f64::NEG_INFINITY)
        } else {
            Some(f64::INFINITY)
        };
    }

    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - digits_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        mantissa_digits += frac_end - frac_start;
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }

    if mantissa_digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, currency: Option<&str>, value: &str) -> serde_json::Value {
        let mut price = serde_json::json!({ "__value__": value });
        if let Some(c) = currency {
            price["_currencyId"] = serde_json::Value::from(c);
        }

        serde_json::json!({
            "title": [title],
            "sellingStatus": [{ "currentPrice": [price] }]
        })
    }

    fn response(items: Vec<serde_json::Value>) -> serde_json::Value {
        serde_json::json!({
            "findCompletedItemsResponse": [{
                "ack": ["Success"],
                "searchResult": [{ "@count": items.len().to_string(), "item": items }]
            }]
        })
    }

    #[test]
    fn query_params() {
        let query = FindingQuery::new("app-123", "vintage camera", "US");

        let params = query.params();
        let keys: Vec<_> = params.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            [
                "OPERATION-NAME",
                "SERVICE-VERSION",
                "SECURITY-APPNAME",
                "RESPONSE-DATA-FORMAT",
                "REST-PAYLOAD",
                "GLOBAL-ID",
                "keywords",
                "paginationInput.entriesPerPage",
                "sortOrder",
                "itemFilter(0).name",
                "itemFilter(0).value",
                "itemFilter(1).name",
                "itemFilter(1).value",
            ]
        );

        let lookup = |key: &str| {
            params
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };
        assert_eq!(lookup("OPERATION-NAME"), "findCompletedItems");
        assert_eq!(lookup("SECURITY-APPNAME"), "app-123");
        assert_eq!(lookup("keywords"), "vintage camera");
        assert_eq!(lookup("paginationInput.entriesPerPage"), "20");
        assert_eq!(lookup("sortOrder"), "EndTimeSoonest");
        assert_eq!(lookup("itemFilter(1).value"), "Used");
    }

    #[test]
    fn every_site_maps_to_us() {
        for site in ["US", "GB", "DE", ""] {
            assert_eq!(FindingQuery::new("id", "q", site).global_id, "EBAY-US");
        }
    }

    #[test]
    fn keeps_upstream_order() {
        let body = response(vec![
            item("first", Some("USD"), "10.00"),
            item("second", Some("USD"), "5.50"),
            item("third", None, "99"),
        ]);

        assert_eq!(
            extract_prices(&body, MAX_RESULTS),
            vec![
                PriceResult { title: "first".into(), price: 10.0 },
                PriceResult { title: "second".into(), price: 5.5 },
                PriceResult { title: "third".into(), price: 99.0 },
            ]
        );
    }

    #[test]
    fn caps_at_limit() {
        let items = (0..8)
            .map(|i| item(&format!("item {i}"), Some("USD"), &format!("{i}.25")))
            .collect();

        let prices = extract_prices(&response(items), MAX_RESULTS);

        let titles: Vec<_> = prices.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["item 0", "item 1", "item 2", "item 3", "item 4"]);
    }

    #[test]
    fn filtered_items_do_not_count_against_limit() {
        let mut items = vec![item("eur", Some("EUR"), "1"), item("empty", Some("USD"), "")];
        items.extend((0..6).map(|i| item(&format!("usd {i}"), Some("USD"), "1")));

        let prices = extract_prices(&response(items), MAX_RESULTS);

        assert_eq!(prices.len(), 5);
        assert_eq!(prices[0].title, "usd 0");
        assert_eq!(prices[4].title, "usd 4");
    }

    #[test]
    fn drops_foreign_currency() {
        assert_eq!(
            extract_item(&item("x", Some("EUR"), "12.00")),
            Err(ItemError::ForeignCurrency("EUR".to_string()))
        );
    }

    #[test]
    fn drops_missing_and_unparseable_prices() {
        assert_eq!(extract_item(&item("x", Some("USD"), "")), Err(ItemError::MissingPrice));
        assert_eq!(
            extract_item(&item("x", Some("USD"), "n/a")),
            Err(ItemError::UnparseablePrice("n/a".to_string()))
        );
        assert_eq!(
            extract_item(&item("x", Some("USD"), "Infinity")),
            Err(ItemError::UnparseablePrice("Infinity".to_string()))
        );
        assert_eq!(
            extract_item(&serde_json::json!({ "title": ["no price"] })),
            Err(ItemError::MissingPrice)
        );
        assert_eq!(
            extract_item(&serde_json::json!({ "title": ["x"], "sellingStatus": [{ "currentPrice": [] }] })),
            Err(ItemError::MissingPrice)
        );
    }

    #[test]
    fn malformed_item_is_skipped_alone() {
        let body = response(vec![
            serde_json::json!({ "title": ["bad"], "sellingStatus": "not a list" }),
            serde_json::json!("just a string"),
            item("good", Some("USD"), "42.00"),
        ]);

        assert!(matches!(
            extract_item(&data::raw_items(&body)[0]),
            Err(ItemError::Malformed(_))
        ));
        assert_eq!(
            extract_prices(&body, MAX_RESULTS),
            vec![PriceResult { title: "good".into(), price: 42.0 }]
        );
    }

    #[test]
    fn odd_title_keeps_the_item() {
        let price = serde_json::json!([{ "_currencyId": "USD", "__value__": "10.00" }]);

        for title in [serde_json::json!({ "x": 1 }), serde_json::json!("Leica")] {
            let raw = serde_json::json!({
                "title": title,
                "sellingStatus": [{ "currentPrice": price.clone() }]
            });

            assert_eq!(
                extract_item(&raw),
                Ok(PriceResult { title: String::new(), price: 10.0 })
            );
        }
    }

    #[test]
    fn both_currency_keys_keep_the_item() {
        let raw = serde_json::json!({
            "title": ["Rolleiflex"],
            "sellingStatus": [{ "currentPrice": [{
                "_currencyId": "USD",
                "@currencyId": "USD",
                "__value__": "450.00"
            }] }]
        });

        assert_eq!(
            extract_item(&raw),
            Ok(PriceResult { title: "Rolleiflex".into(), price: 450.0 })
        );
    }

    #[test]
    fn missing_title_is_empty() {
        let raw = serde_json::json!({
            "sellingStatus": [{ "currentPrice": [{ "__value__": "3.10" }] }]
        });

        assert_eq!(
            extract_item(&raw),
            Ok(PriceResult { title: String::new(), price: 3.1 })
        );
    }

    #[test]
    fn extraction_is_deterministic() {
        let body = response(vec![
            item("a", Some("USD"), "1.00"),
            item("b", Some("GBP"), "2.00"),
            item("c", Some("USD"), "3.00"),
        ]);

        assert_eq!(extract_prices(&body, MAX_RESULTS), extract_prices(&body, MAX_RESULTS));
    }

    #[test]
    fn float_prefix() {
        assert_eq!(parse_float_prefix("129.99"), Some(129.99));
        assert_eq!(parse_float_prefix("  7"), Some(7.0));
        assert_eq!(parse_float_prefix("12.50 USD"), Some(12.5));
        assert_eq!(parse_float_prefix(".5"), Some(0.5));
        assert_eq!(parse_float_prefix("5."), Some(5.0));
        assert_eq!(parse_float_prefix("-3"), Some(-3.0));
        assert_eq!(parse_float_prefix("1e3"), Some(1000.0));
        assert_eq!(parse_float_prefix("1e"), Some(1.0));
        assert_eq!(parse_float_prefix("Infinity"), Some(f64::INFINITY));
        assert_eq!(parse_float_prefix("abc"), None);
        assert_eq!(parse_float_prefix("."), None);
        assert_eq!(parse_float_prefix(""), None);
    }
}
