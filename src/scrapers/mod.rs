pub mod extract;
pub mod flatfox;
pub mod homegate;
pub mod immobilienscout24_at;
pub mod immoscout24;
pub mod traits;
pub mod types;

pub use flatfox::FlatfoxParser;
pub use homegate::HomegateParser;
pub use immobilienscout24_at::ImmobilienScout24AtParser;
pub use immoscout24::ImmoScout24Parser;
pub use traits::SiteParser;
pub use types::SiteIdentity;

use crate::error::{ConfigError, ParserError};
use crate::models::Listing;
use reqwest::Url;
use std::fmt;
use std::sync::Arc;

/// A configured search page bound to the parser of its site
#[derive(Clone)]
pub struct Site {
    identity: SiteIdentity,
    parser: Arc<dyn SiteParser>,
    url: Url,
    origin: Url,
}

impl Site {
    pub fn new(identity: SiteIdentity, parser: Arc<dyn SiteParser>, url: Url) -> Self {
        let origin = url.join("/").unwrap_or_else(|_| url.clone());
        Self {
            identity,
            parser,
            url,
            origin,
        }
    }

    pub fn identity(&self) -> &SiteIdentity {
        &self.identity
    }

    /// The search page polled for this site
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Parse a fetched page and make every listing url absolute.
    pub fn parse_html(&self, html: &str) -> Result<Vec<Listing>, ParserError> {
        let listings = self.parser.parse(html)?;
        Ok(listings
            .into_iter()
            .map(|listing| {
                let url = self.absolute_url(listing.url());
                listing.with_url(url)
            })
            .collect())
    }

    fn absolute_url(&self, path: &str) -> String {
        match self.origin.join(path) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}{}", self.origin.as_str().trim_end_matches('/'), path),
        }
    }
}

impl fmt::Debug for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Site")
            .field("identity", &self.identity)
            .field("url", &self.url.as_str())
            .finish()
    }
}

/// Registry mapping hostnames to site parsers
pub struct SiteRegistry {
    sites: Vec<(SiteIdentity, Arc<dyn SiteParser>)>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self { sites: Vec::new() }
    }

    /// Registry with every site this crate knows how to parse
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(immoscout24::IDENTITY, ImmoScout24Parser);
        registry.register(homegate::IDENTITY, HomegateParser);
        registry.register(immobilienscout24_at::IDENTITY, ImmobilienScout24AtParser);
        registry.register(flatfox::IDENTITY, FlatfoxParser);
        registry
    }

    pub fn register(&mut self, identity: SiteIdentity, parser: impl SiteParser + 'static) {
        let parser: Arc<dyn SiteParser> = Arc::new(parser);
        self.sites.retain(|(known, _)| known.hostname != identity.hostname);
        self.sites.push((identity, parser));
    }

    pub fn hostnames(&self) -> Vec<&'static str> {
        self.sites.iter().map(|(identity, _)| identity.hostname).collect()
    }

    /// Bind a search page URL to its site.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidUrl`] when the URL does not parse or has no host,
    /// [`ConfigError::UnknownSite`] when no parser is registered for the host.
    pub fn resolve(&self, url: &str) -> Result<Site, ConfigError> {
        let parsed = Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let hostname = parsed
            .host_str()
            .ok_or_else(|| ConfigError::InvalidUrl {
                url: url.to_string(),
                reason: "missing host".to_string(),
            })?
            .to_ascii_lowercase();

        let (identity, parser) = self
            .sites
            .iter()
            .find(|(identity, _)| identity.hostname == hostname)
            .ok_or_else(|| ConfigError::UnknownSite {
                hostname: hostname.clone(),
                url: url.to_string(),
            })?;

        Ok(Site::new(*identity, Arc::clone(parser), parsed))
    }
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self::new()
    }
}
