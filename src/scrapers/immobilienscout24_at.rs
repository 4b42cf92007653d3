use crate::error::{ItemError, ParserError};
use crate::models::{lenient_scalar, Listing, PriceKind, RawListing, Scalar};
use crate::scrapers::extract::{
    decode_blob, fill_image_template, lenient_dimension, listings_at, parse_items, script_by_id,
};
use crate::scrapers::traits::SiteParser;
use crate::scrapers::types::SiteIdentity;
use serde::Deserialize;

pub const IDENTITY: SiteIdentity = SiteIdentity {
    hostname: "www.immobilienscout24.at",
    name: "ImmobilienScout24",
    // Same brand as the Swiss site
    icon_url: super::immoscout24::IDENTITY.icon_url,
};

const SITE: &str = IDENTITY.hostname;
const NEXT_DATA_SCRIPT_ID: &str = "__NEXT_DATA__";
const LISTINGS_PATH: &str = "/props/pageProps/searchResult/hits";
const CURRENCY: &str = "EUR";

/// Parser for immobilienscout24.at search result pages
pub struct ImmobilienScout24AtParser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Hit {
    headline: Option<String>,
    address_string: Option<String>,
    links: Option<Links>,
    #[serde(default, deserialize_with = "lenient_scalar")]
    primary_price: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient_scalar")]
    number_of_rooms: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient_scalar")]
    primary_area: Option<Scalar>,
    is_rent: Option<bool>,
    transfer_type: Option<String>,
    pictures: Option<Vec<Picture>>,
}

#[derive(Debug, Deserialize)]
struct Links {
    #[serde(rename = "targetURL")]
    target_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Picture {
    url_scale_and_crop: Option<String>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    width: Option<u32>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    height: Option<u32>,
}

impl SiteParser for ImmobilienScout24AtParser {
    fn parse(&self, html: &str) -> Result<Vec<Listing>, ParserError> {
        let blob = script_by_id(html, NEXT_DATA_SCRIPT_ID).ok_or(ParserError::MissingBlob { site: SITE })?;
        let data = decode_blob(SITE, blob.trim())?;
        let hits = listings_at(SITE, &data, LISTINGS_PATH)?;

        Ok(parse_items(SITE, hits, to_raw_listing))
    }
}

fn to_raw_listing(hit: Hit) -> Result<RawListing, ItemError> {
    let url = hit
        .links
        .and_then(|l| l.target_url)
        .filter(|url| !url.trim().is_empty())
        .ok_or(ItemError::MissingField("links.targetURL"))?;

    let is_sale = hit.is_rent == Some(false)
        || hit
            .transfer_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("buy"));

    let images = hit
        .pictures
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| {
            p.url_scale_and_crop
                .map(|template| fill_image_template(&template, p.width, p.height))
        })
        .collect();

    Ok(RawListing {
        title: hit.headline,
        url,
        images,
        address: hit.address_string,
        price: hit.primary_price,
        price_kind: if is_sale { PriceKind::Price } else { PriceKind::Rent },
        rooms: hit.number_of_rooms,
        living_space: hit.primary_area,
        currency: Some(CURRENCY.to_string()),
    })
}
