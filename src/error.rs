use thiserror::Error;

/// Failure to get a page off the network. Always transient.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// The page no longer looks the way the site parser expects.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("{site}: can't find the listings data blob in the page")]
    MissingBlob { site: &'static str },

    #[error("{site}: listings data blob is not valid JSON: {source}")]
    InvalidJson {
        site: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{site}: listings shape changed, nothing at {path}")]
    ShapeChanged {
        site: &'static str,
        path: &'static str,
    },
}

/// A single listing inside an otherwise valid page could not be read.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("malformed listing: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("listing has no {0}")]
    MissingField(&'static str),
}

/// Startup configuration problems. These abort the process.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required credential: {0}")]
    MissingCredential(&'static str),

    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("invalid scrape URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("no parser for site \"{hostname}\" (from {url})")]
    UnknownSite { hostname: String, url: String },

    #[error("no scrape URLs configured")]
    NoUrls,
}
