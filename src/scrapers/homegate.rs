use crate::error::{ItemError, ParserError};
use crate::models::{lenient_scalar, Listing, PriceKind, RawListing, Scalar};
use crate::scrapers::extract::{
    decode_blob, join_address, listings_at, parse_items, script_with_prefix, unescape_unicode,
};
use crate::scrapers::traits::SiteParser;
use crate::scrapers::types::SiteIdentity;
use serde::Deserialize;
use serde_json::{Map, Value};

pub const IDENTITY: SiteIdentity = SiteIdentity {
    hostname: "www.homegate.ch",
    name: "Homegate",
    icon_url: "https://yt3.ggpht.com/ytc/AKedOLSoh7FW3igKCBh1866eXYyNt87wjZ4QJLXMvn3S5g=s900-c-k-c0x00ffffff-no-rj",
};

const SITE: &str = IDENTITY.hostname;
const STATE_PREFIX: &str = "window.__INITIAL_STATE__=";
const LISTINGS_PATH: &str = "/resultList/search/fullSearch/result/listings";

/// Parser for homegate.ch search result pages
pub struct HomegateParser;

#[derive(Debug, Deserialize)]
struct ResultEntry {
    listing: HomegateListing,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HomegateListing {
    #[serde(default, deserialize_with = "lenient_scalar")]
    id: Option<Scalar>,
    offer_type: Option<String>,
    address: Option<Address>,
    prices: Option<Prices>,
    characteristics: Option<Characteristics>,
    localization: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Address {
    street: Option<String>,
    #[serde(default, deserialize_with = "lenient_scalar")]
    postal_code: Option<Scalar>,
    locality: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Prices {
    currency: Option<String>,
    rent: Option<RentPrices>,
    buy: Option<BuyPrices>,
}

#[derive(Debug, Deserialize)]
struct RentPrices {
    #[serde(default, deserialize_with = "lenient_scalar")]
    gross: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient_scalar")]
    net: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
struct BuyPrices {
    #[serde(default, deserialize_with = "lenient_scalar")]
    price: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Characteristics {
    #[serde(default, deserialize_with = "lenient_scalar")]
    number_of_rooms: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient_scalar")]
    living_space: Option<Scalar>,
}

/// One language version of a listing's texts and media
#[derive(Debug, Default, Deserialize)]
struct Localized {
    text: Option<LocalizedText>,
    attachments: Option<Vec<Attachment>>,
}

#[derive(Debug, Deserialize)]
struct LocalizedText {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Attachment {
    #[serde(rename = "type")]
    kind: Option<String>,
    url: Option<String>,
}

impl SiteParser for HomegateParser {
    fn parse(&self, html: &str) -> Result<Vec<Listing>, ParserError> {
        let blob = script_with_prefix(html, STATE_PREFIX).ok_or(ParserError::MissingBlob { site: SITE })?;
        let state = decode_blob(SITE, &blob)?;
        let items = listings_at(SITE, &state, LISTINGS_PATH)?;

        Ok(parse_items(SITE, items, to_raw_listing))
    }
}

fn to_raw_listing(entry: ResultEntry) -> Result<RawListing, ItemError> {
    let listing = entry.listing;
    let id = listing
        .id
        .map(|id| id.to_string())
        .filter(|id| !id.is_empty())
        .ok_or(ItemError::MissingField("id"))?;

    let is_sale = listing
        .offer_type
        .as_deref()
        .is_some_and(|t| t.eq_ignore_ascii_case("buy"));
    let (price_kind, path) = if is_sale {
        (PriceKind::Price, "buy")
    } else {
        (PriceKind::Rent, "rent")
    };

    let localized = primary_localization(listing.localization.as_ref())?;
    let images = localized
        .attachments
        .unwrap_or_default()
        .into_iter()
        .filter(|a| a.kind.as_deref() == Some("IMAGE"))
        .filter_map(|a| a.url)
        .map(|url| unescape_unicode(&url))
        .collect();

    let address = listing.address.and_then(|a| {
        let zip = a.postal_code.map(|zip| zip.to_string());
        join_address(a.street.as_deref(), zip.as_deref(), a.locality.as_deref(), None)
    });

    let (price, currency) = match listing.prices {
        Some(prices) => {
            let price = if is_sale {
                prices.buy.and_then(|b| b.price)
            } else {
                prices.rent.and_then(|r| r.gross.or(r.net))
            };
            (price, prices.currency)
        }
        None => (None, None),
    };

    let (rooms, living_space) = listing
        .characteristics
        .map(|c| (c.number_of_rooms, c.living_space))
        .unwrap_or_default();

    Ok(RawListing {
        title: localized.text.and_then(|t| t.title),
        url: format!("/{path}/{id}"),
        images,
        address,
        price,
        price_kind,
        rooms,
        living_space,
        currency,
    })
}

/// The localization entry named by `localization.primary`, or an empty one.
fn primary_localization(localization: Option<&Map<String, Value>>) -> Result<Localized, ItemError> {
    let entry = localization.and_then(|map| {
        map.get("primary")
            .and_then(Value::as_str)
            .and_then(|primary| map.get(primary))
    });

    match entry {
        Some(value) => Ok(Localized::deserialize(value)?),
        None => Ok(Localized::default()),
    }
}
