use crate::error::{ItemError, ParserError};
use crate::models::{lenient_scalar, Listing, PriceKind, RawListing, Scalar};
use crate::scrapers::extract::{
    decode_blob, fill_image_template, join_address, lenient_dimension, listings_at, parse_items,
    script_by_id,
};
use crate::scrapers::traits::SiteParser;
use crate::scrapers::types::SiteIdentity;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

pub const IDENTITY: SiteIdentity = SiteIdentity {
    hostname: "www.immoscout24.ch",
    name: "ImmoScout24",
    icon_url: "https://play-lh.googleusercontent.com/9qHvJvi4zgrXzfhsDlJpyU2JEaadxVtLOy0zg3vUNQTAJhZFroCcXObWMEhlhf_sOkQ",
};

const SITE: &str = IDENTITY.hostname;
const STATE_SCRIPT_ID: &str = "state";
const STATE_PREFIX: &str = "__INITIAL_STATE__=";
const LISTINGS_PATH: &str = "/pages/searchResult/resultData/listData";
const OFFER_TYPE_BUY: &str = "2";

// The state carries an "insertion" block with inlined JS right before "maxPriceCalculator"
static INSERTION_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"("insertion":\{.*)("maxPriceCalculator")"#).expect("valid regex")
});

/// Parser for immoscout24.ch search result pages
pub struct ImmoScout24Parser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListItem {
    title: Option<String>,
    street: Option<String>,
    #[serde(default, deserialize_with = "lenient_scalar")]
    zip: Option<Scalar>,
    city_name: Option<String>,
    state_short: Option<String>,
    property_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_scalar")]
    price: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient_scalar")]
    number_of_rooms: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient_scalar")]
    surface_living: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient_scalar")]
    offer_type_id: Option<Scalar>,
    offer_type: Option<String>,
    images: Option<Vec<Image>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Image {
    url: Option<String>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    original_width: Option<u32>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    original_height: Option<u32>,
}

impl SiteParser for ImmoScout24Parser {
    fn parse(&self, html: &str) -> Result<Vec<Listing>, ParserError> {
        let script = script_by_id(html, STATE_SCRIPT_ID).ok_or(ParserError::MissingBlob { site: SITE })?;
        let blob = script.trim();
        let blob = blob.strip_prefix(STATE_PREFIX).unwrap_or(blob);
        let blob = INSERTION_BLOCK.replace(blob, "${2}");

        let state = decode_blob(SITE, &blob)?;
        let items = listings_at(SITE, &state, LISTINGS_PATH)?;

        Ok(parse_items(SITE, items, to_raw_listing))
    }
}

fn to_raw_listing(item: ListItem) -> Result<RawListing, ItemError> {
    let url = item
        .property_url
        .filter(|url| !url.trim().is_empty())
        .ok_or(ItemError::MissingField("propertyUrl"))?;

    let zip = item.zip.map(|zip| zip.to_string());
    let address = join_address(
        item.street.as_deref(),
        zip.as_deref(),
        item.city_name.as_deref(),
        item.state_short.as_deref(),
    );

    let is_sale = item
        .offer_type_id
        .as_ref()
        .is_some_and(|id| id.to_string() == OFFER_TYPE_BUY)
        || item
            .offer_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("buy"));

    let images = item
        .images
        .unwrap_or_default()
        .into_iter()
        .filter_map(|img| {
            img.url
                .map(|template| fill_image_template(&template, img.original_width, img.original_height))
        })
        .collect();

    Ok(RawListing {
        title: item.title,
        url,
        images,
        address,
        price: item.price,
        price_kind: if is_sale { PriceKind::Price } else { PriceKind::Rent },
        rooms: item.number_of_rooms,
        living_space: item.surface_living,
        currency: None,
    })
}
