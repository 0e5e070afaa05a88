use airhorn::{bot, catalog::ClipCatalog, config::{AppConfig, Cli}};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    // Initialize logging first
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "airhorn=debug,songbird=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let cli = Cli::parse();
    let config = AppConfig::init(&cli)?;
    info!("Configuration loaded");

    if config.discord.prefix != "!" {
        info!("Custom prefix has been set to: {}", config.discord.prefix);
    }
    if config.discord.owner_id.is_none() {
        info!("No owner configured, reload is disabled");
    }

    // A missing or unreadable audio directory is fatal
    let catalog = ClipCatalog::load(&config.audio.dir, &config.audio.extension)?;

    info!("Starting Airhorn v{}", env!("CARGO_PKG_VERSION"));
    match bot::start_bot(config, catalog).await {
        Ok(()) => info!("Discord bot shut down gracefully"),
        Err(e) => {
            error!("Discord bot error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
