use std::path::PathBuf;

use regulatory_news::Config;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "regulatory_news=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let mut config = match std::env::var("REGULATORY_NEWS_CONFIG") {
        Ok(path) => Config::load(&path)?,
        Err(_) => Config::builtin()?,
    };
    if let Ok(output) = std::env::var("REGULATORY_NEWS_OUTPUT") {
        config.output_path = PathBuf::from(output);
    }
    info!("Fetching {} regulatory news feeds", config.feeds.len());

    regulatory_news::run(&config).await?;

    Ok(())
}
