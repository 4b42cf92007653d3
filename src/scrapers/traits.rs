use crate::error::ParserError;
use crate::models::Listing;

/// Common trait for all site parsers.
/// New sites are added by implementing this and registering it in the `SiteRegistry`.
pub trait SiteParser: Send + Sync {
    /// Turn a fetched results page into listings, newest first.
    ///
    /// Listing urls may be relative to the site; the registry makes them absolute.
    fn parse(&self, html: &str) -> Result<Vec<Listing>, ParserError>;
}
