use crate::engine::EngineOptions;
use crate::error::ConfigError;
use clap::Parser;
use std::time::Duration;

/// Watches real-estate search pages and posts new listings to Discord
#[derive(Debug, Clone, Parser)]
#[command(author, version, about)]
pub struct Config {
    /// Search result pages to poll, comma separated
    #[arg(long, env = "SCRAPE_URLS", value_delimiter = ',', required = true)]
    pub scrape_urls: Vec<String>,

    /// Discord webhook receiving listings and warnings
    #[arg(long, env = "DISCORD_WEBHOOK")]
    pub discord_webhook: Option<String>,

    /// Google Maps API key for travel distances
    #[arg(long, env = "GOOGLE_MAPS_API_KEY")]
    pub google_maps_api_key: Option<String>,

    /// Address travel distances are computed to
    #[arg(long, env = "GOOGLE_MAPS_DESTINATION")]
    pub google_maps_destination: Option<String>,

    /// Seconds between two polls of the same site
    #[arg(long, env = "SCRAPING_INTERVAL", default_value_t = 120)]
    pub scraping_interval: u64,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT", default_value_t = 30)]
    pub request_timeout: u64,

    /// Send the most recent listing of every site once, then exit
    #[arg(long, env = "PREVIEW")]
    pub preview: bool,

    /// Also post parser failures to Discord
    #[arg(long, env = "NOTIFY_PARSER_ERRORS")]
    pub notify_parser_errors: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Distance lookup settings, present only when both key and destination are set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceConfig {
    pub api_key: String,
    pub destination: String,
}

impl Config {
    /// Load `.env` if present, then parse flags and environment.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::parse()
    }

    /// Check everything that can't be expressed as a clap constraint.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scrape_urls.iter().all(|url| url.trim().is_empty()) {
            return Err(ConfigError::NoUrls);
        }

        if self.webhook().is_none() {
            return Err(ConfigError::MissingCredential("DISCORD_WEBHOOK"));
        }

        if self.google_maps_destination.is_some() && self.google_maps_api_key.is_none() {
            return Err(ConfigError::MissingCredential("GOOGLE_MAPS_API_KEY"));
        }

        if self.scraping_interval == 0 {
            return Err(ConfigError::InvalidValue {
                name: "SCRAPING_INTERVAL",
                reason: "must be at least 1 second".to_string(),
            });
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                name: "REQUEST_TIMEOUT",
                reason: "must be at least 1 second".to_string(),
            });
        }

        Ok(())
    }

    /// Configured URLs without blanks, in the order given
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.scrape_urls
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
    }

    pub fn webhook(&self) -> Option<&str> {
        self.discord_webhook
            .as_deref()
            .map(str::trim)
            .filter(|hook| !hook.is_empty())
    }

    pub fn distance(&self) -> Option<DistanceConfig> {
        match (&self.google_maps_api_key, &self.google_maps_destination) {
            (Some(api_key), Some(destination)) => Some(DistanceConfig {
                api_key: api_key.clone(),
                destination: destination.clone(),
            }),
            _ => None,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            interval: Duration::from_secs(self.scraping_interval),
            preview: self.preview,
            notify_parser_errors: self.notify_parser_errors,
        }
    }
}
