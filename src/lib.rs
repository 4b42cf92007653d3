pub mod config;
pub mod distance;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod notify;
pub mod scrapers;

pub use engine::{Engine, EngineOptions, RoundOutcome, Snapshot};
pub use error::{ConfigError, NetworkError, ParserError};
pub use models::{Listing, PriceKind, RawListing};
pub use scrapers::{Site, SiteIdentity, SiteParser, SiteRegistry};
