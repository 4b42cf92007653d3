//! Webhook payloads sent by `DiscordNotifier`, checked against a `wiremock` server.

use std::time::Duration;

use serde_json::Value;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use immo_watch::distance::GoogleMaps;
use immo_watch::fetcher::build_client;
use immo_watch::models::Scalar;
use immo_watch::notify::{DiscordNotifier, Notifier};
use immo_watch::{Listing, PriceKind, RawListing, SiteIdentity};

const SITE: SiteIdentity = SiteIdentity {
    hostname: "www.homegate.ch",
    name: "Homegate",
    icon_url: "https://icons.example/homegate.png",
};

fn client() -> reqwest::Client {
    build_client(Duration::from_secs(5)).expect("failed to build test client")
}

fn listing(address: Option<&str>, images: usize) -> Listing {
    Listing::from(RawListing {
        title: Some("Sonnige 3.5-Zimmer-Wohnung".to_string()),
        address: address.map(str::to_string),
        price: Some(Scalar::Int(2450)),
        price_kind: PriceKind::Rent,
        rooms: Some(Scalar::Float(3.5)),
        living_space: Some(Scalar::Int(78)),
        images: (0..images)
            .map(|i| format!("https://media.example/{i}.jpg"))
            .collect(),
        ..RawListing::new("https://www.homegate.ch/rent/4000123")
    })
}

async fn webhook_server(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/webhooks/1/token"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
    server
}

async fn posted_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .expect("request recording is enabled")
        .iter()
        .filter(|request| request.url.path() == "/api/webhooks/1/token")
        .map(|request| serde_json::from_slice(&request.body).expect("webhook body is JSON"))
        .collect()
}

#[tokio::test]
async fn listing_is_posted_as_embed() {
    let server = webhook_server(204).await;
    let notifier = DiscordNotifier::new(format!("{}/api/webhooks/1/token", server.uri()), client());

    notifier
        .notify_new_listing(&listing(Some("Bahnhofstrasse 3, 3011 Bern"), 2), &SITE)
        .await
        .expect("webhook accepts the listing");

    let bodies = posted_bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    let embeds = bodies[0]["embeds"].as_array().expect("embeds array");
    assert_eq!(embeds.len(), 2);

    let main = &embeds[0];
    assert_eq!(main["title"], "Sonnige 3.5-Zimmer-Wohnung");
    assert_eq!(main["url"], "https://www.homegate.ch/rent/4000123");
    assert_eq!(main["color"], 5_373_709);
    assert_eq!(main["author"]["name"], "www.homegate.ch");
    assert_eq!(main["author"]["url"], "https://www.homegate.ch");
    assert_eq!(main["footer"]["text"], "Bahnhofstrasse 3, 3011 Bern");
    assert_eq!(main["image"]["url"], "https://media.example/0.jpg");

    let fields = main["fields"].as_array().expect("fields array");
    assert_eq!(fields[0]["name"], "Rent");
    assert_eq!(fields[0]["value"], "2450 CHF");
    assert_eq!(fields[1]["value"], "3.5");
    assert_eq!(fields[2]["value"], "78 m²");
    assert_eq!(fields.len(), 3);

    assert_eq!(embeds[1]["url"], "https://www.homegate.ch/rent/4000123");
    assert_eq!(embeds[1]["image"]["url"], "https://media.example/1.jpg");
}

#[tokio::test]
async fn warning_is_posted_as_plain_content() {
    let server = webhook_server(204).await;
    let notifier = DiscordNotifier::new(format!("{}/api/webhooks/1/token", server.uri()), client());

    notifier
        .notify_warning(&SITE, "fresh listings empty, HTML likely changed!")
        .await
        .expect("webhook accepts the warning");

    let bodies = posted_bodies(&server).await;
    assert_eq!(
        bodies[0]["content"],
        "www.homegate.ch fresh listings empty, HTML likely changed!"
    );
    assert!(bodies[0].get("embeds").is_none());
}

#[tokio::test]
async fn rejected_webhook_is_an_error() {
    let server = webhook_server(500).await;
    let notifier = DiscordNotifier::new(format!("{}/api/webhooks/1/token", server.uri()), client());

    let result = notifier.notify_warning(&SITE, "test").await;

    assert!(result.is_err());
}

#[tokio::test]
async fn distance_field_is_added_when_lookup_succeeds() {
    let server = webhook_server(204).await;
    Mock::given(method("GET"))
        .and(path("/maps/api/distancematrix/json"))
        .and(query_param("origins", "Bahnhofstrasse 3, 3011 Bern"))
        .and(query_param("destinations", "Bundesplatz 1, 3005 Bern"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "rows": [{ "elements": [{
                "distance": { "text": "1.4 km", "value": 1400 },
                "duration": { "text": "6 mins", "value": 330 }
            }]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let maps = GoogleMaps::new(client(), "key-123").with_base_url(server.uri());
    let notifier = DiscordNotifier::new(format!("{}/api/webhooks/1/token", server.uri()), client())
        .with_distance(maps, "Bundesplatz 1, 3005 Bern");

    notifier
        .notify_new_listing(&listing(Some("Bahnhofstrasse 3, 3011 Bern"), 0), &SITE)
        .await
        .expect("webhook accepts the listing");

    let bodies = posted_bodies(&server).await;
    let fields = bodies[0]["embeds"][0]["fields"].as_array().expect("fields array");
    assert_eq!(fields.len(), 4);
    assert_eq!(fields[3]["name"], "Distance");
    assert_eq!(fields[3]["value"], "1.4 km (6 min.)");
}

#[tokio::test]
async fn listing_without_address_skips_distance_lookup() {
    let server = webhook_server(204).await;
    Mock::given(method("GET"))
        .and(path("/maps/api/distancematrix/json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let maps = GoogleMaps::new(client(), "key-123").with_base_url(server.uri());
    let notifier = DiscordNotifier::new(format!("{}/api/webhooks/1/token", server.uri()), client())
        .with_distance(maps, "Bundesplatz 1, 3005 Bern");

    notifier
        .notify_new_listing(&listing(None, 0), &SITE)
        .await
        .expect("webhook accepts the listing");

    let bodies = posted_bodies(&server).await;
    let main = &bodies[0]["embeds"][0];
    assert_eq!(main["footer"]["text"], "No address");
    assert_eq!(main["fields"].as_array().map(Vec::len), Some(3));
    assert!(main.get("image").is_none());
}

fn listing_with_images(images: Vec<String>) -> Listing {
    Listing::from(RawListing {
        title: Some("Dachwohnung".to_string()),
        images,
        ..RawListing::new("https://www.homegate.ch/rent/4000124")
    })
}

#[tokio::test]
async fn non_jpeg_image_is_uploaded_as_attachment() {
    let server = webhook_server(200).await;
    Mock::given(method("GET"))
        .and(path("/media/living-room.webp"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"RIFF-webp-pixels".to_vec(), "image/webp"))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = DiscordNotifier::new(format!("{}/api/webhooks/1/token", server.uri()), client());
    let listing = listing_with_images(vec![
        format!("{}/media/living-room.webp", server.uri()),
        "https://media.example/kitchen.jpg".to_string(),
    ]);

    notifier
        .notify_new_listing(&listing, &SITE)
        .await
        .expect("webhook accepts the listing");

    let requests = server.received_requests().await.expect("request recording is enabled");
    let webhook = requests
        .iter()
        .find(|request| request.url.path() == "/api/webhooks/1/token")
        .expect("webhook was called");

    let content_type = webhook
        .headers
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("multipart/form-data"), "got {content_type}");

    let body = String::from_utf8_lossy(&webhook.body);
    assert!(body.contains("name=\"payload_json\""));
    assert!(body.contains("attachment://image0.jpg"));
    assert!(body.contains("https://media.example/kitchen.jpg"));
    assert!(body.contains("name=\"files[0]\""));
    assert!(body.contains("filename=\"image0.jpg\""));
    assert!(body.to_ascii_lowercase().contains("content-type: image/webp"));
    assert!(body.contains("RIFF-webp-pixels"));
}

#[tokio::test]
async fn image_that_fails_to_download_stays_linked() {
    let server = webhook_server(204).await;
    Mock::given(method("GET"))
        .and(path("/media/gone.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let notifier = DiscordNotifier::new(format!("{}/api/webhooks/1/token", server.uri()), client());
    let image = format!("{}/media/gone.png", server.uri());

    notifier
        .notify_new_listing(&listing_with_images(vec![image.clone()]), &SITE)
        .await
        .expect("webhook accepts the listing");

    let bodies = posted_bodies(&server).await;
    assert_eq!(bodies[0]["embeds"][0]["image"]["url"], image.as_str());
}
