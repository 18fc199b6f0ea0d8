mod extract;
mod search;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mapscout-cli")]
#[command(about = "Collect place records from map search results")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a search in Chromium and print the collected places as JSON
    Search {
        /// Free-text search, e.g. "coffee in Lisbon"
        query: String,
        /// Maximum number of places to return (1-100)
        #[arg(long, default_value = "20")]
        max_places: u32,
        /// Interface language passed to the search view
        #[arg(long, default_value = "en")]
        lang: String,
        /// Show the browser window instead of running headless
        #[arg(long)]
        headed: bool,
        /// Also extract website, phone and opening hours
        #[arg(long)]
        details: bool,
    },
    /// Extract a place record from a saved detail-page HTML file
    Extract {
        file: PathBuf,
        /// Link recorded on the extracted place (defaults to the file path)
        #[arg(long)]
        link: Option<String>,
        /// Also extract website, phone and opening hours
        #[arg(long)]
        details: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = mapscout_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Search {
            query,
            max_places,
            lang,
            headed,
            details,
        } => {
            search::run_search(
                &config,
                &search::SearchArgs {
                    query,
                    max_places,
                    lang,
                    headless: !headed,
                    details,
                },
            )
            .await?;
        }
        Commands::Extract {
            file,
            link,
            details,
        } => extract::run_extract(&file, link.as_deref(), details).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests;
