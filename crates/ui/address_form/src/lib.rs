pub mod action;
pub mod app;
pub mod cli;
pub mod components;
pub mod config;
pub mod errors;
pub mod form;
pub mod location;
pub mod logging;
pub mod theme;
pub mod tui;

use std::sync::Arc;

use color_eyre::Result;
use geocoding::{Geocoder, NominatimClient, SuggestionRecord};
use tracing::info;

use crate::{
    app::App,
    cli::{Cli, Cmd},
    config::Config,
};

/// Load the configuration and apply command line overrides.
pub fn load_config(args: &Cli) -> Result<Config> {
    let mut config = Config::new()?;
    if let Some(endpoint) = &args.endpoint {
        config.geocoding.endpoint = endpoint.clone();
    }
    Ok(config)
}

pub fn geocoder(config: &Config) -> Result<Arc<dyn Geocoder>> {
    let client = NominatimClient::new(&config.geocoding.endpoint, &config.geocoding.user_agent)?;
    Ok(Arc::new(client))
}

pub async fn run(args: Cli) -> Result<()> {
    let config = load_config(&args)?;
    match args.cmd.clone().unwrap_or(Cmd::Run) {
        Cmd::Run => {
            let geocoder = geocoder(&config)?;
            let mut app = App::new(config, geocoder, args.tick_rate, args.frame_rate);
            app.run().await
        }
        Cmd::Search { query, limit } => {
            let limit = limit.unwrap_or(config.geocoding.limit);
            let suggestions = search(geocoder(&config)?.as_ref(), &config, &query, limit).await?;
            println!("{}", serde_json::to_string_pretty(&suggestions)?);
            Ok(())
        }
    }
}

/// One lookup with the configured timeout; failures print the user-facing message.
pub async fn search(
    geocoder: &dyn Geocoder,
    config: &Config,
    query: &str,
    limit: usize,
) -> Result<Vec<SuggestionRecord>> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }
    match geocoding::search_with_timeout(geocoder, query, limit, config.geocoding.timeout()).await {
        Ok(suggestions) => {
            info!(query, count = suggestions.len(), "search finished");
            Ok(suggestions)
        }
        Err(err) => {
            eprintln!("{}", err.user_message());
            Err(err.into())
        }
    }
}
