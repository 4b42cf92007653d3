use crate::distance::GoogleMaps;
use crate::models::{Listing, DEFAULT_ADDRESS};
use crate::notify::Notifier;
use crate::scrapers::SiteIdentity;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use serde::Serialize;
use tracing::warn;

const EMBED_COLOR: u32 = 5_373_709;
/// Discord shows at most this many images per listing message
const MAX_IMAGES: usize = 4;
/// Content type sent for downloaded images when the host doesn't name one
const FALLBACK_IMAGE_TYPE: &str = "image/jpeg";

/// Posts listings as embeds to a Discord webhook
#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    client: Client,
    distance: Option<DistanceAnnotation>,
}

#[derive(Clone)]
struct DistanceAnnotation {
    maps: GoogleMaps,
    destination: String,
}

/// An image downloaded to be uploaded with the message
#[derive(Debug)]
struct ImageFile {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

#[derive(Debug, Serialize)]
struct WebhookPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    embeds: Vec<Embed>,
}

#[derive(Debug, Default, Serialize)]
struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<EmbedAuthor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<EmbedImage>,
}

#[derive(Debug, Serialize)]
struct EmbedAuthor {
    name: String,
    url: String,
    icon_url: String,
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: String,
    value: String,
    inline: bool,
}

#[derive(Debug, Serialize)]
struct EmbedFooter {
    text: String,
}

#[derive(Debug, Serialize)]
struct EmbedImage {
    url: String,
}

impl EmbedField {
    fn inline(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            inline: true,
        }
    }
}

impl DiscordNotifier {
    pub fn new(webhook: impl Into<String>, client: Client) -> Self {
        Self {
            webhook: webhook.into(),
            client,
            distance: None,
        }
    }

    /// Annotate listings with the travel distance to `destination`
    pub fn with_distance(mut self, maps: GoogleMaps, destination: impl Into<String>) -> Self {
        self.distance = Some(DistanceAnnotation {
            maps,
            destination: destination.into(),
        });
        self
    }

    async fn travel_distance(&self, listing: &Listing) -> Option<String> {
        let annotation = self.distance.as_ref()?;
        if listing.address() == DEFAULT_ADDRESS {
            return None;
        }

        let travel = annotation
            .maps
            .compute_distance(listing.address(), &annotation.destination)
            .await;

        match (travel.distance, travel.duration) {
            (Some(distance), Some(duration)) => Some(format!("{distance} ({duration})")),
            _ => None,
        }
    }

    /// Embed image URLs for `images`, plus the files to upload with the message.
    ///
    /// Discord only renders embed images from URLs that look like JPEGs. Anything
    /// else is downloaded and referenced as `attachment://`. An image that fails
    /// to download keeps its remote URL.
    async fn viewable_images(&self, images: &[String]) -> (Vec<String>, Vec<ImageFile>) {
        let mut urls = Vec::with_capacity(images.len());
        let mut files = Vec::new();

        for (index, url) in images.iter().enumerate() {
            if is_embeddable(url) {
                urls.push(url.clone());
                continue;
            }

            match self.download(url).await {
                Ok((content_type, bytes)) => {
                    let filename = format!("image{index}.jpg");
                    urls.push(format!("attachment://{filename}"));
                    files.push(ImageFile {
                        filename,
                        content_type,
                        bytes,
                    });
                }
                Err(e) => {
                    warn!(url = %url, error = %format!("{e:#}"), "Image download failed, linking it instead");
                    urls.push(url.clone());
                }
            }
        }

        (urls, files)
    }

    async fn download(&self, url: &str) -> Result<(String, Vec<u8>)> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Image request failed")?
            .error_for_status()
            .context("Image host returned an error status")?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .filter(|value| value.starts_with("image/"))
            .unwrap_or(FALLBACK_IMAGE_TYPE)
            .to_string();
        let bytes = response.bytes().await.context("Failed to read image body")?;

        Ok((content_type, bytes.to_vec()))
    }

    async fn send_with_files(&self, payload: &WebhookPayload, files: Vec<ImageFile>) -> Result<()> {
        if files.is_empty() {
            return self.send(payload).await;
        }

        let payload_json = serde_json::to_string(payload).context("Failed to encode webhook payload")?;
        let mut form = Form::new().text("payload_json", payload_json);
        for (index, file) in files.into_iter().enumerate() {
            let part = Part::bytes(file.bytes)
                .file_name(file.filename)
                .mime_str(&file.content_type)
                .context("Invalid image content type")?;
            form = form.part(format!("files[{index}]"), part);
        }

        self.client
            .post(&self.webhook)
            .multipart(form)
            .send()
            .await
            .context("Discord webhook request failed")?
            .error_for_status()
            .context("Discord webhook returned an error status")?;
        Ok(())
    }

    async fn send(&self, payload: &WebhookPayload) -> Result<()> {
        self.client
            .post(&self.webhook)
            .json(payload)
            .send()
            .await
            .context("Discord webhook request failed")?
            .error_for_status()
            .context("Discord webhook returned an error status")?;
        Ok(())
    }
}

/// Whether Discord renders the image straight from its URL
fn is_embeddable(url: &str) -> bool {
    let path = Url::parse(url)
        .map(|parsed| parsed.path().to_ascii_lowercase())
        .unwrap_or_else(|_| url.to_ascii_lowercase());
    path.ends_with(".jpg") || path.ends_with(".jpeg")
}

fn listing_payload(
    listing: &Listing,
    site: &SiteIdentity,
    images: &[String],
    distance: Option<String>,
    now: DateTime<Utc>,
) -> WebhookPayload {
    let mut fields = vec![
        EmbedField::inline(listing.price_kind().label(), listing.price()),
        EmbedField::inline("Rooms", listing.rooms()),
        EmbedField::inline("Living space", listing.living_space()),
    ];
    if let Some(distance) = distance {
        fields.push(EmbedField::inline("Distance", &distance));
    }

    let mut images = images.iter().take(MAX_IMAGES);

    let main = Embed {
        title: Some(listing.title().to_string()),
        url: Some(listing.url().to_string()),
        color: Some(EMBED_COLOR),
        timestamp: Some(now),
        author: Some(EmbedAuthor {
            name: site.hostname.to_string(),
            url: site.home_url(),
            icon_url: site.icon_url.to_string(),
        }),
        fields,
        footer: Some(EmbedFooter {
            text: listing.address().to_string(),
        }),
        image: images.next().map(|url| EmbedImage { url: url.clone() }),
    };

    // Embeds sharing the listing url are shown by Discord as one gallery
    let gallery = images.map(|url| Embed {
        url: Some(listing.url().to_string()),
        image: Some(EmbedImage { url: url.clone() }),
        ..Embed::default()
    });

    WebhookPayload {
        content: None,
        embeds: std::iter::once(main).chain(gallery).collect(),
    }
}

fn warning_payload(site: &SiteIdentity, message: &str) -> WebhookPayload {
    WebhookPayload {
        content: Some(format!("{} {}", site.hostname, message)),
        embeds: Vec::new(),
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify_new_listing(&self, listing: &Listing, site: &SiteIdentity) -> Result<()> {
        let distance = self.travel_distance(listing).await;
        let shown = &listing.images()[..listing.images().len().min(MAX_IMAGES)];
        let (images, files) = self.viewable_images(shown).await;
        let payload = listing_payload(listing, site, &images, distance, Utc::now());
        self.send_with_files(&payload, files).await
    }

    async fn notify_warning(&self, site: &SiteIdentity, message: &str) -> Result<()> {
        self.send(&warning_payload(site, message)).await
    }
}
