use serde::{Deserialize, Serialize};

use crate::model::CanonicalRecord;
use crate::normalize::format_currency;
use crate::search::{MatchMode, SearchOutcome};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub item_code: String,
    pub name: String,
    pub barcode: String,
    pub price: f64,
    pub price_display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    pub query: String,
    pub mode: MatchMode,
    pub total: usize,
    pub shown: usize,
    pub loaded: usize,
    pub results: Vec<ProductDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResponse {
    pub fn from_outcome(
        query: &str,
        outcome: &SearchOutcome<'_>,
        loaded: usize,
        error: Option<&str>,
    ) -> Self {
        Self {
            query: query.to_string(),
            mode: outcome.mode,
            total: outcome.total,
            shown: outcome.hits.len(),
            loaded,
            results: outcome.hits.iter().map(|record| ProductDto::from(*record)).collect(),
            error: error.map(str::to_string),
        }
    }
}

impl From<&CanonicalRecord> for ProductDto {
    fn from(value: &CanonicalRecord) -> Self {
        let amount = value.price_amount();
        let last_updated = value.last_updated().trim();
        Self {
            item_code: value.item_code().to_string(),
            name: value.name().to_string(),
            barcode: value.barcode().to_string(),
            price: amount,
            price_display: format_currency(amount),
            last_updated: (!last_updated.is_empty()).then(|| last_updated.to_string()),
        }
    }
}
