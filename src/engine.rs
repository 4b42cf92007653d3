//! Per-site polling loop: fetch, parse, diff against the previous round and
//! hand new listings to the notifier.
//!
//! Sites list their ads newest first and give them no stable id, so the url is
//! the identity. A round's new listings are everything in front of the first
//! listing that was also seen in the previous round. This assumes listings are
//! only ever prepended or retired, never reordered.

use crate::fetcher::Fetch;
use crate::models::Listing;
use crate::notify::Notifier;
use crate::scrapers::Site;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, warn, Instrument};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(120);
pub const EMPTY_LISTINGS_WARNING: &str = "fresh listings empty, HTML likely changed!";

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Pause between two rounds
    pub interval: Duration,
    /// Send only the most recent listing of the first round, then stop
    pub preview: bool,
    /// Also report parser errors to the notifier, not just the log
    pub notify_parser_errors: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            preview: false,
            notify_parser_errors: false,
        }
    }
}

/// Listings seen in the last successful round
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    /// No round has succeeded yet
    NoPriorRound,
    Seen(Vec<Listing>),
}

/// What a single round did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    FetchFailed,
    ParseFailed,
    /// Page parsed but held no listings
    Empty,
    /// First successful round; listings adopted without notifying
    Baseline { listings: usize },
    /// `new` listings were dispatched; `all_new` when nothing overlapped the previous round
    Updated { new: usize, all_new: bool },
    /// Preview listing sent; the engine stops
    Previewed,
}

/// Index in `fresh` of the first listing also present in `previous`.
///
/// `previous` is scanned in order and, for each entry, `fresh` is searched from
/// the front; the first hit wins. Listings before that index are new.
pub fn first_mutual_index(previous: &[Listing], fresh: &[Listing]) -> Option<usize> {
    previous
        .iter()
        .find_map(|old| fresh.iter().position(|new| new.url() == old.url()))
}

/// Polls one site forever
pub struct Engine {
    site: Site,
    fetcher: Arc<dyn Fetch>,
    notifier: Arc<dyn Notifier>,
    options: EngineOptions,
    previous: Snapshot,
}

impl Engine {
    pub fn new(
        site: Site,
        fetcher: Arc<dyn Fetch>,
        notifier: Arc<dyn Notifier>,
        options: EngineOptions,
    ) -> Self {
        Self {
            site,
            fetcher,
            notifier,
            options,
            previous: Snapshot::NoPriorRound,
        }
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.previous
    }

    /// Run rounds until the process ends, or until the preview is sent.
    pub async fn run(mut self) {
        let span = info_span!("site", host = self.site.identity().hostname);

        async move {
            info!(url = %self.site.url(), "Starting scraping");
            loop {
                if self.run_round().await == RoundOutcome::Previewed {
                    info!("Preview sent, stopping");
                    return;
                }
                tokio::time::sleep(self.options.interval).await;
            }
        }
        .instrument(span)
        .await
    }

    /// One fetch, parse, diff and dispatch pass.
    ///
    /// The snapshot is only replaced when the page parsed into at least one listing.
    pub async fn run_round(&mut self) -> RoundOutcome {
        let html = match self.fetcher.fetch(self.site.url().as_str()).await {
            Ok(html) => html,
            Err(e) => {
                warn!(error = %e, "Fetch failed, retrying next round");
                return RoundOutcome::FetchFailed;
            }
        };

        let fresh = match self.site.parse_html(&html) {
            Ok(listings) => listings,
            Err(e) => {
                warn!(error = %e, "Parsing failed, retrying next round");
                if self.options.notify_parser_errors {
                    self.send_warning(&e.to_string()).await;
                }
                return RoundOutcome::ParseFailed;
            }
        };

        if fresh.is_empty() {
            warn!("{}", EMPTY_LISTINGS_WARNING);
            self.send_warning(EMPTY_LISTINGS_WARNING).await;
            return RoundOutcome::Empty;
        }

        if self.options.preview {
            debug!("Preview mode: sending most recent listing");
            self.send_listing(&fresh[0]).await;
            self.previous = Snapshot::Seen(fresh);
            return RoundOutcome::Previewed;
        }

        let mutual = match &self.previous {
            Snapshot::NoPriorRound => None,
            Snapshot::Seen(previous) => Some(first_mutual_index(previous, &fresh)),
        };

        let Some(mutual) = mutual else {
            info!("First round, adopting {} listings without notifying", fresh.len());
            let listings = fresh.len();
            self.previous = Snapshot::Seen(fresh);
            return RoundOutcome::Baseline { listings };
        };

        let all_new = mutual.is_none();
        let split = mutual.unwrap_or(fresh.len());

        if all_new {
            warn!("All fresh listings are new");
            let message = format!(
                "Next {split} listings from {} are all new, please check manually if there might be more.",
                self.site.identity().hostname
            );
            self.send_warning(&message).await;
        }

        // Oldest first, so notifications arrive in the order the listings appeared
        for listing in fresh[..split].iter().rev() {
            self.send_listing(listing).await;
        }

        if split > 0 {
            info!("{} new listings", split);
        }

        self.previous = Snapshot::Seen(fresh);
        RoundOutcome::Updated {
            new: split,
            all_new,
        }
    }

    async fn send_listing(&self, listing: &Listing) {
        match self
            .notifier
            .notify_new_listing(listing, self.site.identity())
            .await
        {
            Ok(()) => debug!(url = listing.url(), "Sent listing"),
            Err(e) => error!(url = listing.url(), error = %format!("{e:#}"), "Failed to send listing"),
        }
    }

    async fn send_warning(&self, message: &str) {
        if let Err(e) = self
            .notifier
            .notify_warning(self.site.identity(), message)
            .await
        {
            error!(error = %format!("{e:#}"), "Failed to send warning");
        }
    }
}
