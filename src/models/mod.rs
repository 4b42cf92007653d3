use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

pub const DEFAULT_TITLE: &str = "No title";
pub const DEFAULT_ADDRESS: &str = "No address";
pub const DEFAULT_PRICE: &str = "On request";
pub const DEFAULT_ROOMS: &str = "-";
pub const DEFAULT_LIVING_SPACE: &str = "-";
pub const DEFAULT_CURRENCY: &str = "CHF";

/// Whether a listing is offered for rent or for sale
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum PriceKind {
    #[default]
    Rent,
    Price,
}

impl PriceKind {
    /// Label shown next to the price in notifications
    pub fn label(self) -> &'static str {
        match self {
            PriceKind::Rent => "Rent",
            PriceKind::Price => "Price",
        }
    }
}

/// A raw scalar as sites hand it out: sometimes a number, sometimes a string.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Numbers and strings; anything else counts as absent.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(Scalar::Int)
                .or_else(|| n.as_f64().map(Scalar::Float)),
            Value::String(s) => Some(Scalar::Text(s.clone())),
            _ => None,
        }
    }
}

/// Field deserializer for `Option<Scalar>`: a bool, array or object leaves the
/// field empty instead of failing the whole record.
///
/// Use together with `#[serde(default)]` so a missing key is `None` too.
pub fn lenient_scalar<'de, D>(deserializer: D) -> Result<Option<Scalar>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(Scalar::from_value(&value))
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(n) => write!(f, "{n}"),
            Scalar::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{x:.0}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Text(s) => f.write_str(s.trim()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

/// Values extracted by a site parser before defaults and units are applied.
///
/// Only `url` is mandatory; a parser that cannot find one skips the item.
#[derive(Debug, Clone, Default)]
pub struct RawListing {
    pub title: Option<String>,
    pub url: String,
    pub images: Vec<String>,
    pub address: Option<String>,
    pub price: Option<Scalar>,
    pub price_kind: PriceKind,
    pub rooms: Option<Scalar>,
    pub living_space: Option<Scalar>,
    pub currency: Option<String>,
}

impl RawListing {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// Canonical listing, identical in shape for every site.
///
/// Fields are only readable; a listing never changes after construction.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Listing {
    title: String,
    url: String,
    images: Vec<String>,
    address: String,
    price: String,
    price_kind: PriceKind,
    rooms: String,
    living_space: String,
    currency: String,
}

impl Listing {
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Identity of the listing within its site
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn price(&self) -> &str {
        &self.price
    }

    pub fn price_kind(&self) -> PriceKind {
        self.price_kind
    }

    pub fn rooms(&self) -> &str {
        &self.rooms
    }

    pub fn living_space(&self) -> &str {
        &self.living_space
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Same listing under a different url (used to absolutize site-relative paths)
    pub(crate) fn with_url(self, url: String) -> Self {
        Self { url, ..self }
    }
}

impl From<RawListing> for Listing {
    fn from(raw: RawListing) -> Self {
        let currency = non_blank(raw.currency).unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        let price = scalar_or(raw.price, DEFAULT_PRICE);
        let living_space = scalar_or(raw.living_space, DEFAULT_LIVING_SPACE);

        Self {
            title: non_blank(raw.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            url: raw.url,
            images: raw.images,
            address: non_blank(raw.address).unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
            price: with_unit(&price, &format!(" {currency}")),
            price_kind: raw.price_kind,
            rooms: scalar_or(raw.rooms, DEFAULT_ROOMS),
            living_space: with_unit(&living_space, " m²"),
            currency,
        }
    }
}

/// Appends `suffix` to `value` only when `value` is a bare number.
///
/// Already suffixed or free-text values come back unchanged.
pub fn with_unit(value: &str, suffix: &str) -> String {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        format!("{value}{suffix}")
    } else {
        value.to_string()
    }
}

fn scalar_or(value: Option<Scalar>, default: &str) -> String {
    non_blank(value.map(|v| v.to_string())).unwrap_or_else(|| default.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_fall_back_to_defaults() {
        let listing = Listing::from(RawListing::new("/rent/1"));

        assert_eq!(listing.title(), "No title");
        assert_eq!(listing.url(), "/rent/1");
        assert!(listing.images().is_empty());
        assert_eq!(listing.address(), "No address");
        assert_eq!(listing.price(), "On request");
        assert_eq!(listing.price_kind(), PriceKind::Rent);
        assert_eq!(listing.rooms(), "-");
        assert_eq!(listing.living_space(), "-");
        assert_eq!(listing.currency(), "CHF");
    }

    #[test]
    fn numeric_price_gets_currency_suffix() {
        let listing = Listing::from(RawListing {
            price: Some(Scalar::Int(1200)),
            ..RawListing::new("/a")
        });
        assert_eq!(listing.price(), "1200 CHF");
    }

    #[test]
    fn currency_drives_price_suffix() {
        let listing = Listing::from(RawListing {
            price: Some("950".into()),
            currency: Some("EUR".to_string()),
            ..RawListing::new("/a")
        });
        assert_eq!(listing.price(), "950 EUR");
        assert_eq!(listing.currency(), "EUR");
    }

    #[test]
    fn textual_price_is_left_alone() {
        let listing = Listing::from(RawListing {
            price: Some("CHF 1'200.–".into()),
            ..RawListing::new("/a")
        });
        assert_eq!(listing.price(), "CHF 1'200.–");
    }

    #[test]
    fn living_space_gets_square_metres() {
        let listing = Listing::from(RawListing {
            living_space: Some(Scalar::Float(85.0)),
            ..RawListing::new("/a")
        });
        assert_eq!(listing.living_space(), "85 m²");
    }

    #[test]
    fn fractional_living_space_stays_bare() {
        let listing = Listing::from(RawListing {
            living_space: Some(Scalar::Float(85.5)),
            ..RawListing::new("/a")
        });
        assert_eq!(listing.living_space(), "85.5");
    }

    #[test]
    fn rooms_are_stringified() {
        let whole = Listing::from(RawListing {
            rooms: Some(Scalar::Int(3)),
            ..RawListing::new("/a")
        });
        let half = Listing::from(RawListing {
            rooms: Some(Scalar::Float(3.5)),
            ..RawListing::new("/b")
        });
        assert_eq!(whole.rooms(), "3");
        assert_eq!(half.rooms(), "3.5");
    }

    #[test]
    fn blank_strings_count_as_missing() {
        let listing = Listing::from(RawListing {
            title: Some("   ".to_string()),
            address: Some(String::new()),
            price: Some("".into()),
            ..RawListing::new("/a")
        });
        assert_eq!(listing.title(), "No title");
        assert_eq!(listing.address(), "No address");
        assert_eq!(listing.price(), "On request");
    }

    #[test]
    fn suffix_is_not_applied_twice() {
        let once = with_unit("1200", " CHF");
        assert_eq!(once, "1200 CHF");
        assert_eq!(with_unit(&once, " CHF"), "1200 CHF");
        assert_eq!(with_unit("On request", " CHF"), "On request");
        assert_eq!(with_unit("", " m²"), "");
    }

    #[derive(Debug, Deserialize)]
    struct Record {
        #[serde(default, deserialize_with = "lenient_scalar")]
        value: Option<Scalar>,
    }

    fn record(json: &str) -> Option<Scalar> {
        serde_json::from_str::<Record>(json).unwrap().value
    }

    #[test]
    fn scalar_reads_numbers_and_strings() {
        assert_eq!(record(r#"{"value": 4}"#), Some(Scalar::Int(4)));
        assert_eq!(record(r#"{"value": 2.5}"#), Some(Scalar::Float(2.5)));
        assert_eq!(record(r#"{"value": "120"}"#), Some(Scalar::Text("120".to_string())));
    }

    #[test]
    fn odd_scalar_types_count_as_absent() {
        assert_eq!(record(r#"{"value": null}"#), None);
        assert_eq!(record(r#"{"value": false}"#), None);
        assert_eq!(record(r#"{"value": [1, 2]}"#), None);
        assert_eq!(record(r#"{"value": {"value": 3}}"#), None);
        assert_eq!(record("{}"), None);
    }

    #[test]
    fn with_url_keeps_other_fields() {
        let listing = Listing::from(RawListing {
            title: Some("Loft".to_string()),
            ..RawListing::new("/a")
        })
        .with_url("https://example.ch/a".to_string());
        assert_eq!(listing.url(), "https://example.ch/a");
        assert_eq!(listing.title(), "Loft");
    }
}
