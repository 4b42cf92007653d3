use anyhow::{Context, Result};
use immo_watch::config::Config;
use immo_watch::distance::GoogleMaps;
use immo_watch::fetcher::{build_client, Fetch, HttpFetcher};
use immo_watch::notify::{DiscordNotifier, Notifier};
use immo_watch::{Engine, SiteRegistry};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🏠 Immo Watch");

    config.validate()?;

    // Every URL must map to a known site before anything starts polling
    let registry = SiteRegistry::builtin();
    let sites = config
        .urls()
        .map(|url| registry.resolve(url))
        .collect::<Result<Vec<_>, _>>()?;

    let client = build_client(config.request_timeout())?;
    let fetcher: Arc<dyn Fetch> = Arc::new(HttpFetcher::new(client.clone()));

    let webhook = config
        .webhook()
        .context("DISCORD_WEBHOOK is not set")?;
    let mut discord = DiscordNotifier::new(webhook, client.clone());
    if let Some(distance) = config.distance() {
        info!(destination = %distance.destination, "Annotating listings with travel distance");
        discord = discord.with_distance(
            GoogleMaps::new(client.clone(), distance.api_key),
            distance.destination,
        );
    }
    let notifier: Arc<dyn Notifier> = Arc::new(discord);

    let options = config.engine_options();
    if options.preview {
        info!("Preview mode: sending one listing per site, then exiting");
    }

    let mut tasks = JoinSet::new();
    for site in sites {
        info!(host = site.identity().hostname, url = %site.url(), "Watching");
        let engine = Engine::new(site, Arc::clone(&fetcher), Arc::clone(&notifier), options.clone());
        tasks.spawn(engine.run());
    }

    let interrupted = tokio::select! {
        _ = wait_for_all(&mut tasks) => false,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            true
        }
    };

    if interrupted {
        info!("Shutting down");
        tasks.shutdown().await;
    } else {
        info!("All sites done");
    }

    Ok(())
}

async fn wait_for_all(tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            error!(error = %e, "Site task stopped unexpectedly");
        }
    }
}
