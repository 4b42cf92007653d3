//! Shared building blocks for the site parsers: finding the embedded state
//! blob, repairing it into valid JSON, walking to the listings array and
//! normalizing image URLs.

use crate::error::{ItemError, ParserError};
use crate::models::{Listing, RawListing, Scalar};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::borrow::Cow;
use tracing::error;

pub const MAX_IMAGE_WIDTH: u32 = 1280;
pub const MAX_IMAGE_HEIGHT: u32 = 720;
/// Assumed size of an image whose dimensions the site does not report
pub const DEFAULT_IMAGE_WIDTH: u32 = 1024;
pub const DEFAULT_IMAGE_HEIGHT: u32 = 728;
const IMAGE_RESIZE_MODE: &str = "3";
const IMAGE_QUALITY: &str = "90";

static SCRIPT: Lazy<Selector> = Lazy::new(|| Selector::parse("script").expect("valid selector"));
static UNDEFINED_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([:\[,]\s*)undefined\b").expect("valid regex"));

/// Text of the `<script>` element with the given `id`.
pub(crate) fn script_by_id(html: &str, id: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let text = document
        .select(&SCRIPT)
        .find(|script| script.value().id() == Some(id))
        .map(|script| script.text().collect::<String>());
    text
}

/// Text of the first `<script>` whose content starts with `prefix`, with the prefix removed.
pub(crate) fn script_with_prefix(html: &str, prefix: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let text = document.select(&SCRIPT).find_map(|script| {
        let text = script.text().collect::<String>();
        text.trim_start()
            .strip_prefix(prefix)
            .map(|rest| rest.trim().trim_end_matches(';').to_string())
    });
    text
}

/// Replaces JavaScript `undefined` values with `null`.
pub(crate) fn replace_undefined(raw: &str) -> Cow<'_, str> {
    UNDEFINED_LITERAL.replace_all(raw, "${1}null")
}

/// Decodes a state blob after repairing known non-JSON tokens.
pub(crate) fn decode_blob(site: &'static str, raw: &str) -> Result<Value, ParserError> {
    serde_json::from_str(&replace_undefined(raw))
        .map_err(|source| ParserError::InvalidJson { site, source })
}

/// The listings array at `pointer` (JSON pointer syntax).
pub(crate) fn listings_at<'a>(
    site: &'static str,
    root: &'a Value,
    pointer: &'static str,
) -> Result<&'a [Value], ParserError> {
    root.pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or(ParserError::ShapeChanged {
            site,
            path: pointer,
        })
}

/// Deserializes every item into the site's record type and builds listings.
///
/// An item that fails is logged with its raw JSON and skipped; the rest of the
/// batch is still returned.
pub(crate) fn parse_items<T, F>(site: &'static str, items: &[Value], build: F) -> Vec<Listing>
where
    T: DeserializeOwned,
    F: Fn(T) -> Result<RawListing, ItemError>,
{
    items
        .iter()
        .filter_map(|item| {
            let parsed = T::deserialize(item)
                .map_err(ItemError::from)
                .and_then(&build);
            match parsed {
                Ok(raw) => Some(Listing::from(raw)),
                Err(e) => {
                    error!(site, item = %item, error = %e, "Skipping listing");
                    None
                }
            }
        })
        .collect()
}

/// Size of an image scaled to fit within `max_width` x `max_height`, keeping its aspect ratio.
///
/// A zero width or height is treated as the default image size.
pub fn scaled_image_size(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    let width = f64::from(if width == 0 { DEFAULT_IMAGE_WIDTH } else { width });
    let height = f64::from(if height == 0 {
        DEFAULT_IMAGE_HEIGHT
    } else {
        height
    });

    let ratio = (f64::from(max_width) / width).min(f64::from(max_height) / height);

    ((width * ratio).round() as u32, (height * ratio).round() as u32)
}

/// Field deserializer for image dimensions.
///
/// Whole or fractional numbers and numeric strings are rounded to pixels; anything
/// else is unknown, so the default image size applies. Use with `#[serde(default)]`.
pub(crate) fn lenient_dimension<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let pixels = match Scalar::from_value(&value) {
        Some(Scalar::Int(n)) => n as f64,
        Some(Scalar::Float(x)) => x,
        Some(Scalar::Text(s)) => s.trim().parse().unwrap_or(0.0),
        None => 0.0,
    };

    Ok((pixels.is_finite() && pixels >= 1.0).then(|| pixels.min(f64::from(u32::MAX)).round() as u32))
}

/// Fills the `{width}`, `{height}`, `{resizemode}` and `{quality}` placeholders of an image URL template.
pub(crate) fn fill_image_template(
    template: &str,
    original_width: Option<u32>,
    original_height: Option<u32>,
) -> String {
    let (width, height) = scaled_image_size(
        original_width.unwrap_or(0),
        original_height.unwrap_or(0),
        MAX_IMAGE_WIDTH,
        MAX_IMAGE_HEIGHT,
    );

    template
        .replacen("{width}", &width.to_string(), 1)
        .replacen("{height}", &height.to_string(), 1)
        .replacen("{resizemode}", IMAGE_RESIZE_MODE, 1)
        .replacen("{quality}", IMAGE_QUALITY, 1)
}

/// Resolves literal `\uXXXX` escapes, including UTF-16 surrogate pairs.
/// Invalid sequences are kept as they are.
pub(crate) fn unescape_unicode(input: &str) -> String {
    fn code_unit(s: &str) -> Option<u32> {
        s.get(..4)
            .filter(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find("\\u") {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 2..];

        let decoded = code_unit(after).and_then(|high| {
            if (0xD800..=0xDBFF).contains(&high) {
                let low = after[4..]
                    .strip_prefix("\\u")
                    .and_then(code_unit)
                    .filter(|low| (0xDC00..=0xDFFF).contains(low))?;
                char::from_u32(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)).map(|c| (c, 10))
            } else {
                char::from_u32(high).map(|c| (c, 4))
            }
        });

        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &after[consumed..];
            }
            None => {
                out.push_str("\\u");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Joins `street, zip city, region`, leaving out whatever is missing.
pub(crate) fn join_address(
    street: Option<&str>,
    zip: Option<&str>,
    city: Option<&str>,
    region: Option<&str>,
) -> Option<String> {
    fn present(part: Option<&str>) -> Option<&str> {
        part.map(str::trim).filter(|p| !p.is_empty())
    }

    let locality = [present(zip), present(city)]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

    let parts: Vec<&str> = [present(street), present(Some(locality.as_str())), present(region)]
        .into_iter()
        .flatten()
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}
