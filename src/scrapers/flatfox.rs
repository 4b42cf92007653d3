use crate::error::{ItemError, ParserError};
use crate::models::{lenient_scalar, Listing, PriceKind, RawListing, Scalar};
use crate::scrapers::extract::{decode_blob, listings_at, parse_items, script_by_id};
use crate::scrapers::traits::SiteParser;
use crate::scrapers::types::SiteIdentity;
use serde::Deserialize;

pub const IDENTITY: SiteIdentity = SiteIdentity {
    hostname: "flatfox.ch",
    name: "Flatfox",
    icon_url: "https://flatfox.ch/static/img/favicon/apple-touch-icon.png",
};

const SITE: &str = IDENTITY.hostname;
const LISTINGS_SCRIPT_ID: &str = "flatfox-listings";
const LISTINGS_PATH: &str = "/results";
const MEDIA_ORIGIN: &str = "https://flatfox.ch";

/// Parser for flatfox.ch search pages
pub struct FlatfoxParser;

#[derive(Debug, Deserialize)]
struct Flat {
    url: Option<String>,
    short_title: Option<String>,
    description_title: Option<String>,
    public_address: Option<String>,
    offer_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_scalar")]
    rent_gross: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient_scalar")]
    price_display: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient_scalar")]
    number_of_rooms: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient_scalar")]
    livingspace: Option<Scalar>,
    cover_image: Option<FlatImage>,
    images: Option<Vec<FlatImage>>,
}

#[derive(Debug, Deserialize)]
struct FlatImage {
    url: Option<String>,
}

impl SiteParser for FlatfoxParser {
    fn parse(&self, html: &str) -> Result<Vec<Listing>, ParserError> {
        let blob = script_by_id(html, LISTINGS_SCRIPT_ID).ok_or(ParserError::MissingBlob { site: SITE })?;
        let data = decode_blob(SITE, blob.trim())?;
        let flats = listings_at(SITE, &data, LISTINGS_PATH)?;

        Ok(parse_items(SITE, flats, to_raw_listing))
    }
}

fn to_raw_listing(flat: Flat) -> Result<RawListing, ItemError> {
    let url = flat
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or(ItemError::MissingField("url"))?;

    let is_sale = flat
        .offer_type
        .as_deref()
        .is_some_and(|t| t.eq_ignore_ascii_case("sale"));

    let price = if is_sale {
        flat.price_display
    } else {
        flat.rent_gross.or(flat.price_display)
    };

    // Cover first, then the gallery without repeating the cover
    let mut images: Vec<String> = Vec::new();
    for image in flat.cover_image.into_iter().chain(flat.images.unwrap_or_default()) {
        if let Some(url) = image.url.map(|u| absolute_media_url(&u)) {
            if !images.contains(&url) {
                images.push(url);
            }
        }
    }

    Ok(RawListing {
        title: flat.description_title.or(flat.short_title),
        url,
        images,
        address: flat.public_address,
        price,
        price_kind: if is_sale { PriceKind::Price } else { PriceKind::Rent },
        rooms: flat.number_of_rooms,
        living_space: flat.livingspace,
        currency: None,
    })
}

fn absolute_media_url(url: &str) -> String {
    if url.starts_with('/') {
        format!("{MEDIA_ORIGIN}{url}")
    } else {
        url.to_string()
    }
}
