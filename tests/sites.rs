//! Built-in sites, resolved from a search URL and fed whole pages.

use immo_watch::{ParserError, PriceKind, SiteRegistry};
use serde_json::json;

#[test]
fn homegate_page_yields_absolute_listing_urls() {
    let state = json!({
        "resultList": {"search": {"fullSearch": {"result": {"listings": [
            {"listing": {
                "id": "4001",
                "offerType": "RENT",
                "address": {"street": "Wylerstrasse 9", "postalCode": "3014", "locality": "Bern"},
                "prices": {"currency": "CHF", "rent": {"gross": 1650}},
                "characteristics": {"numberOfRooms": 2, "livingSpace": 51.0},
                "localization": {"primary": "de", "de": {"text": {"title": "Altbau-Perle"}}}
            }},
            {"listing": {"offerType": "RENT"}},
            {"listing": {"id": "4000", "offerType": "BUY", "prices": {"buy": {"price": 890000}}}}
        ]}}}}
    });
    let html = format!("<html><body><script>window.__INITIAL_STATE__={state}</script></body></html>");

    let site = SiteRegistry::builtin()
        .resolve("https://www.homegate.ch/rent/real-estate/city-bern/matching-list")
        .expect("homegate is built in");
    let listings = site.parse_html(&html).expect("page parses");

    let urls: Vec<&str> = listings.iter().map(|l| l.url()).collect();
    assert_eq!(
        urls,
        ["https://www.homegate.ch/rent/4001", "https://www.homegate.ch/buy/4000"]
    );

    assert_eq!(listings[0].title(), "Altbau-Perle");
    assert_eq!(listings[0].rooms(), "2");
    assert_eq!(listings[0].living_space(), "51 m²");
    assert_eq!(listings[0].price(), "1650 CHF");

    assert_eq!(listings[1].price_kind(), PriceKind::Price);
    assert_eq!(listings[1].price(), "890000 CHF");
    assert_eq!(listings[1].title(), "No title");
    assert_eq!(listings[1].address(), "No address");
}

#[test]
fn immoscout24_state_with_js_literals_still_parses() {
    let html = r#"<html><body><script id="state">__INITIAL_STATE__={"pages":{"searchResult":{"resultData":{"listData":[{"title":"Loft","propertyUrl":"/de/d/loft-mieten-zuerich/7001","price":3100,"numberOfRooms":undefined,"cityName":"Zürich","zip":"8005"}]}}},"insertion":{"fn":function(){return 1},"x":1},"maxPriceCalculator":{}}</script></body></html>"#;

    let site = SiteRegistry::builtin()
        .resolve("https://www.immoscout24.ch/de/wohnung/mieten/ort-zuerich")
        .expect("immoscout24 is built in");
    let listings = site.parse_html(html).expect("page parses");

    assert_eq!(listings.len(), 1);
    assert_eq!(
        listings[0].url(),
        "https://www.immoscout24.ch/de/d/loft-mieten-zuerich/7001"
    );
    assert_eq!(listings[0].rooms(), "-");
    assert_eq!(listings[0].address(), "8005 Zürich");
}

#[test]
fn page_without_data_is_a_parser_error() {
    let site = SiteRegistry::builtin()
        .resolve("https://flatfox.ch/en/search/?east=7.5")
        .expect("flatfox is built in");

    let err = site
        .parse_html("<html><body><h1>Maintenance</h1></body></html>")
        .unwrap_err();

    assert!(matches!(err, ParserError::MissingBlob { site: "flatfox.ch" }));
}
