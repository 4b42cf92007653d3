use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

pub const GOOGLE_MAPS_BASE_URL: &str = "https://maps.googleapis.com";
const DISTANCE_MATRIX_PATH: &str = "/maps/api/distancematrix/json";

/// Travel distance and duration between two addresses, as display strings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TravelDistance {
    /// e.g. "4.2 km"
    pub distance: Option<String>,
    /// e.g. "12 min."
    pub duration: Option<String>,
}

/// Google Maps Distance Matrix client
#[derive(Clone)]
pub struct GoogleMaps {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    distance: Option<TextValue>,
    duration: Option<SecondsValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    text: String,
}

#[derive(Debug, Deserialize)]
struct SecondsValue {
    value: f64,
}

impl GoogleMaps {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: GOOGLE_MAPS_BASE_URL.to_string(),
        }
    }

    /// Point requests at another host (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Distance and travel time from `origin` to `destination`.
    ///
    /// Never fails: any error yields an empty [`TravelDistance`].
    pub async fn compute_distance(&self, origin: &str, destination: &str) -> TravelDistance {
        let url = match Url::parse_with_params(
            &format!("{}{}", self.base_url.trim_end_matches('/'), DISTANCE_MATRIX_PATH),
            &[
                ("origins", origin),
                ("destinations", destination),
                ("key", self.api_key.as_str()),
            ],
        ) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Invalid distance matrix URL");
                return TravelDistance::default();
            }
        };

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Distance matrix request failed");
                return TravelDistance::default();
            }
        };

        if response.status() != StatusCode::OK {
            debug!(status = %response.status(), "Distance matrix returned non-200");
            return TravelDistance::default();
        }

        match response.json::<MatrixResponse>().await {
            Ok(matrix) => travel_distance(matrix),
            Err(e) => {
                debug!(error = %e, "Unexpected distance matrix response");
                TravelDistance::default()
            }
        }
    }
}

fn travel_distance(matrix: MatrixResponse) -> TravelDistance {
    let element = matrix
        .rows
        .into_iter()
        .next()
        .and_then(|row| row.elements.into_iter().next());

    match element {
        Some(MatrixElement {
            distance: Some(distance),
            duration: Some(duration),
        }) => {
            let minutes = (duration.value / 60.0).ceil() as u64;
            TravelDistance {
                distance: Some(distance.text),
                duration: Some(format!("{minutes} min.")),
            }
        }
        _ => TravelDistance::default(),
    }
}
