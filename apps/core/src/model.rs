use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::normalize::{parse_price, parse_timestamp, pick_name, Normalizer};

pub const NO_KEY_SENTINEL: &str = "SIN-CLAVE";
pub const EMPTY_DISPLAY: &str = "—";

/// One input row keyed by header. Empty cells read as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    cells: BTreeMap<String, String>,
}

impl RawRecord {
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut record = Self::default();
        for (key, value) in pairs {
            record.insert(key, value);
        }
        record
    }

    /// Keeps the first value seen for a repeated column.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.cells.entry(key.into()).or_insert_with(|| value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.cells
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Price as it arrived: CSV text, or a number from an older cache payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceValue {
    Number(f64),
    Text(String),
}

impl PriceValue {
    pub fn amount(&self) -> f64 {
        match self {
            Self::Number(value) if value.is_finite() => *value,
            Self::Number(_) => 0.0,
            Self::Text(text) => parse_price(text),
        }
    }
}

impl Default for PriceValue {
    fn default() -> Self {
        Self::Text("0".to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFields {
    pub item_code: String,
    pub name: String,
    pub barcode: String,
    pub price: PriceValue,
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BusinessKey {
    Value(String),
    NoKey,
}

impl BusinessKey {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Value(value) => value,
            Self::NoKey => NO_KEY_SENTINEL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    #[serde(default)]
    item_code: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    barcode: String,
    #[serde(default)]
    price: PriceValue,
    #[serde(default)]
    last_updated: String,
    #[serde(default, rename = "_kName")]
    normalized_name: String,
    #[serde(default, rename = "_kCode")]
    normalized_code: String,
    #[serde(default, rename = "_kBarcode")]
    normalized_barcode: String,
    #[serde(default, rename = "_kAll")]
    normalized_all: String,
}

impl CanonicalRecord {
    pub fn from_fields(fields: ProductFields, normalizer: &Normalizer) -> Self {
        let ProductFields {
            item_code,
            name,
            barcode,
            price,
            last_updated,
        } = fields;

        Self {
            item_code,
            name,
            barcode,
            price,
            last_updated,
            normalized_name: String::new(),
            normalized_code: String::new(),
            normalized_barcode: String::new(),
            normalized_all: String::new(),
        }
        .rehydrate(normalizer)
    }

    pub fn from_raw(raw: &RawRecord, normalizer: &Normalizer) -> Self {
        let text = |key: &str| raw.get(key).unwrap_or_default().to_string();
        let fields = ProductFields {
            item_code: text("itemCode"),
            name: pick_name(raw),
            barcode: text("barcode"),
            price: raw
                .get("price")
                .map(|price| PriceValue::Text(price.to_string()))
                .unwrap_or_default(),
            last_updated: text("lastUpdated"),
        };
        Self::from_fields(fields, normalizer)
    }

    /// Derives any comparison key that is missing, e.g. after reading a cache
    /// payload written before that key existed.
    pub fn rehydrate(mut self, normalizer: &Normalizer) -> Self {
        if self.normalized_name.is_empty() {
            self.normalized_name = normalizer.apply(&self.name);
        }
        if self.normalized_code.is_empty() {
            self.normalized_code = normalizer.apply(&self.item_code);
        }
        if self.normalized_barcode.is_empty() {
            self.normalized_barcode = normalizer.apply(&self.barcode);
        }
        if self.normalized_all.is_empty() {
            let joined = [self.name.as_str(), &self.item_code, &self.barcode].join(" ");
            self.normalized_all = normalizer.apply(&joined);
        }
        self
    }

    pub fn item_code(&self) -> &str {
        &self.item_code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn barcode(&self) -> &str {
        &self.barcode
    }

    pub fn price(&self) -> &PriceValue {
        &self.price
    }

    pub fn last_updated(&self) -> &str {
        &self.last_updated
    }

    pub fn normalized_name(&self) -> &str {
        &self.normalized_name
    }

    pub fn normalized_code(&self) -> &str {
        &self.normalized_code
    }

    pub fn normalized_barcode(&self) -> &str {
        &self.normalized_barcode
    }

    pub fn normalized_all(&self) -> &str {
        &self.normalized_all
    }

    pub fn price_amount(&self) -> f64 {
        self.price.amount()
    }

    pub fn timestamp_millis(&self) -> Option<i64> {
        parse_timestamp(&self.last_updated)
    }

    pub fn business_key(&self) -> BusinessKey {
        [&self.item_code, &self.barcode, &self.name]
            .into_iter()
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
            .map(|value| BusinessKey::Value(value.to_string()))
            .unwrap_or(BusinessKey::NoKey)
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            EMPTY_DISPLAY
        } else {
            &self.name
        }
    }

    pub fn display_last_updated(&self) -> &str {
        if self.last_updated.is_empty() {
            EMPTY_DISPLAY
        } else {
            &self.last_updated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BusinessKey, CanonicalRecord, PriceValue, RawRecord};
    use crate::normalize::Normalizer;

    #[test]
    fn builds_canonical_record_from_aliased_row() {
        let raw = RawRecord::from_pairs([
            ("Producto", "Café Molido"),
            ("itemCode", "A-1"),
            ("barcode", "779123"),
            ("price", "1.500,00"),
            ("proveedor", "ACME"),
        ]);

        let record = CanonicalRecord::from_raw(&raw, &Normalizer::default());

        assert_eq!(record.name(), "Café Molido");
        assert_eq!(record.normalized_name(), "cafe molido");
        assert_eq!(record.normalized_code(), "a-1");
        assert_eq!(record.normalized_all(), "cafe molido a-1 779123");
        assert_eq!(record.price_amount(), 1500.0);
        assert_eq!(record.timestamp_millis(), None);
    }

    #[test]
    fn missing_price_defaults_to_zero_text() {
        let record = CanonicalRecord::from_raw(
            &RawRecord::from_pairs([("name", "Agua")]),
            &Normalizer::default(),
        );
        assert_eq!(record.price(), &PriceValue::Text("0".to_string()));
        assert_eq!(record.display_last_updated(), "—");
    }

    #[test]
    fn business_key_prefers_code_then_barcode_then_name() {
        let normalizer = Normalizer::default();
        let with_code = CanonicalRecord::from_raw(
            &RawRecord::from_pairs([("itemCode", " X1 "), ("barcode", "77"), ("name", "N")]),
            &normalizer,
        );
        assert_eq!(with_code.business_key(), BusinessKey::Value("X1".to_string()));

        let with_barcode = CanonicalRecord::from_raw(
            &RawRecord::from_pairs([("itemCode", "  "), ("barcode", "77"), ("name", "N")]),
            &normalizer,
        );
        assert_eq!(with_barcode.business_key().as_str(), "77");

        let keyless = CanonicalRecord::from_raw(&RawRecord::default(), &normalizer);
        assert_eq!(keyless.business_key(), BusinessKey::NoKey);
        assert_eq!(keyless.business_key().as_str(), "SIN-CLAVE");
        assert_eq!(keyless.display_name(), "—");
    }

    #[test]
    fn rehydrates_keys_missing_from_cached_payload() {
        let payload = r#"{"itemCode":"7","name":"Pan Dulce","barcode":"","price":"10,5","lastUpdated":""}"#;
        let cached: CanonicalRecord = serde_json::from_str(payload).unwrap();
        assert_eq!(cached.normalized_name(), "");

        let record = cached.rehydrate(&Normalizer::default());
        assert_eq!(record.normalized_name(), "pan dulce");
        assert_eq!(record.normalized_all(), "pan dulce 7");
    }

    #[test]
    fn numeric_cached_price_is_used_directly() {
        let payload = r#"{"name":"Te","price":12.5}"#;
        let cached: CanonicalRecord = serde_json::from_str(payload).unwrap();
        assert_eq!(cached.price_amount(), 12.5);
    }
}
