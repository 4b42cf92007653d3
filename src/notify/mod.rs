pub mod discord;

pub use discord::DiscordNotifier;

use crate::models::Listing;
use crate::scrapers::SiteIdentity;
use anyhow::Result;
use async_trait::async_trait;

/// Where new listings and site warnings are delivered
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_new_listing(&self, listing: &Listing, site: &SiteIdentity) -> Result<()>;

    async fn notify_warning(&self, site: &SiteIdentity, message: &str) -> Result<()>;
}
