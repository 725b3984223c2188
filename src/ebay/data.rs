/*
{
    "findCompletedItemsResponse": [{
        "ack": ["Success"],
        "version": ["1.13.0"],
        "searchResult": [{
            "@count": "1",
            "item": [{
                "itemId": ["256173342188"],
                "title": ["Canon AE-1 Program 35mm SLR Film Camera"],
                "sellingStatus": [{
                    "currentPrice": [{ "@currencyId": "USD", "__value__": "129.99" }],
                    "sellingState": ["EndedWithSales"]
                }]
            }]
        }]
    }]
}

Depending on the REST-PAYLOAD flavour the currency attribute shows up as
`@currencyId` or `_currencyId`, both are accepted.
*/

use serde::Deserialize;

/// Every level of the Finding API response is wrapped in a single-element array.
type Wrapped<T> = Option<Vec<T>>;

fn first<T>(wrapped: &Wrapped<T>) -> Option<&T> {
    wrapped.as_ref().and_then(|w| w.first())
}

#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItem {
    /// Usually `["..."]`, kept loose so an odd title never drops the item.
    #[serde(default)]
    pub title: Option<serde_json::Value>,
    #[serde(default)]
    pub selling_status: Wrapped<SellingStatus>,
}

#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellingStatus {
    #[serde(default)]
    pub current_price: Wrapped<Price>,
}

#[derive(Debug, Default, PartialEq, Deserialize)]
pub struct Price {
    #[serde(default, rename = "_currencyId")]
    pub currency: Option<String>,
    #[serde(default, rename = "@currencyId")]
    pub currency_attr: Option<String>,
    #[serde(default, rename = "__value__")]
    pub value: Option<serde_json::Value>,
}

impl RawItem {
    /// The listing title as text, empty when missing.
    pub fn title(&self) -> String {
        match self.title.as_ref().and_then(|t| t.get(0)) {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    pub fn current_price(&self) -> Option<&Price> {
        first(&self.selling_status).and_then(|status| first(&status.current_price))
    }
}

impl Price {
    /// The currency code, treating an empty code like a missing one.
    /// `_currencyId` wins over `@currencyId` when both are present.
    pub fn currency(&self) -> Option<&str> {
        self.currency
            .as_deref()
            .filter(|c| !c.is_empty())
            .or_else(|| self.currency_attr.as_deref().filter(|c| !c.is_empty()))
    }

    /// The raw textual value, `None` when missing or empty.
    pub fn value_text(&self) -> Option<String> {
        match self.value.as_ref()? {
            serde_json::Value::String(s) if s.is_empty() => None,
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Walks `findCompletedItemsResponse[0].searchResult[0].item` and returns the
/// raw item records. Any missing or oddly shaped link yields an empty list.
pub fn raw_items(body: &serde_json::Value) -> &[serde_json::Value] {
    body.get("findCompletedItemsResponse")
        .and_then(|r| r.get(0))
        .and_then(|r| r.get("searchResult"))
        .and_then(|r| r.get(0))
        .and_then(|r| r.get("item"))
        .and_then(|items| items.as_array())
        .map(|items| items.as_slice())
        .unwrap_or_default()
}
