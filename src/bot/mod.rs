pub mod commands;
pub mod handler;

use crate::catalog::ClipCatalog;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::playback::{PlaybackTiming, RoomRegistry};
use crate::voice::SongbirdTransport;
use poise::serenity_prelude::{self as serenity, FullEvent, GatewayIntents};
use songbird::{SerenityInit, Songbird};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Shared data accessible in all commands
pub struct Data {
    pub config: &'static AppConfig,
    pub registry: Arc<RoomRegistry>,
    catalog: RwLock<Arc<ClipCatalog>>,
}

impl Data {
    pub fn new(config: &'static AppConfig, catalog: ClipCatalog, registry: Arc<RoomRegistry>) -> Self {
        Self {
            config,
            registry,
            catalog: RwLock::new(Arc::new(catalog)),
        }
    }

    /// Snapshot of the current catalog.
    pub async fn catalog(&self) -> Arc<ClipCatalog> {
        self.catalog.read().await.clone()
    }

    /// Rebuild the catalog from disk and swap it in.
    ///
    /// The current catalog stays in place if loading fails.
    pub async fn reload_catalog(&self) -> AppResult<Arc<ClipCatalog>> {
        let audio = self.config.audio.clone();
        let catalog = tokio::task::spawn_blocking(move || ClipCatalog::load(&audio.dir, &audio.extension))
            .await
            .map_err(|e| AppError::internal(format!("Catalog load task failed: {}", e)))??;

        let catalog = Arc::new(catalog);
        *self.catalog.write().await = catalog.clone();
        Ok(catalog)
    }
}

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data").field("registry", &self.registry).finish()
    }
}

type Error = Box<dyn std::error::Error + Send + Sync>;

/// Event handler for Discord events
async fn event_handler(
    ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            info!("Bot is ready! Logged in as {}", data_about_bot.user.name);
            ctx.set_activity(Some(serenity::ActivityData::playing("sounds")));
        }
        FullEvent::Message { new_message } => {
            handler::handle_message(ctx, new_message, data).await;
        }
        FullEvent::GuildCreate { guild, is_new: _ } => {
            handler::handle_guild_create(guild);
        }
        _ => {}
    }
    Ok(())
}

fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
}

/// Create and configure the Discord bot framework
pub fn create_framework(data: Data) -> poise::Framework<Data, Error> {
    let owners: HashSet<serenity::UserId> = data
        .config
        .discord
        .owner_id
        .map(serenity::UserId::new)
        .into_iter()
        .collect();

    poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all_commands(),
            owners,
            initialize_owners: false,
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Command error: {}", error);
                            let _ = ctx.say(format!("An error occurred: {}", error)).await;
                        }
                        poise::FrameworkError::Setup { error, .. } => {
                            error!("Setup error: {}", error);
                        }
                        err => {
                            error!("Framework error: {:?}", err);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Registered {} slash commands globally", framework.options().commands.len());
                Ok(data)
            })
        })
        .build()
}

/// Start the bot on the configured shard and run until shutdown.
pub async fn start_bot(config: &'static AppConfig, catalog: ClipCatalog) -> AppResult<()> {
    if config.discord.token.is_empty() {
        return Err(AppError::MissingToken);
    }

    let songbird = Songbird::serenity();
    let transport = Arc::new(SongbirdTransport::new(songbird.clone()));
    let registry = RoomRegistry::new(transport, PlaybackTiming::from(&config.playback));

    let framework = create_framework(Data::new(config, catalog, registry));

    let mut client = serenity::ClientBuilder::new(&config.discord.token, intents())
        .framework(framework)
        .register_songbird_with(songbird)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, closing Discord session");
        shard_manager.shutdown_all().await;
    });

    let shard = config.discord.shard_id;
    let shards = config.discord.shards();
    info!(shard, shards, "Starting Discord session...");
    client.start_shard(shard, shards).await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{dca, Clip};
    use crate::config::AudioConfig;
    use crate::playback::{ChannelId, RoomId, TransportError, VoiceTransport};
    use async_trait::async_trait;

    struct SilentTransport;

    #[async_trait]
    impl VoiceTransport for SilentTransport {
        async fn join(&self, _: RoomId, _: ChannelId) -> Result<(), TransportError> {
            Ok(())
        }
        async fn switch(&self, _: RoomId, _: ChannelId) -> Result<(), TransportError> {
            Ok(())
        }
        async fn set_speaking(&self, _: RoomId, _: bool) -> Result<(), TransportError> {
            Ok(())
        }
        async fn send_clip(&self, _: RoomId, _: &Clip) -> Result<(), TransportError> {
            Ok(())
        }
        async fn leave(&self, _: RoomId) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn data_for(dir: &std::path::Path) -> Data {
        let config: &'static AppConfig = Box::leak(Box::new(AppConfig {
            audio: AudioConfig {
                dir: dir.to_path_buf(),
                extension: "dca".into(),
            },
            ..Default::default()
        }));
        let registry = RoomRegistry::new(Arc::new(SilentTransport), PlaybackTiming::immediate());
        Data::new(config, ClipCatalog::default(), registry)
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_catalog() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("audio");
        std::fs::create_dir(&dir).unwrap();
        let raw = dca::encode_frames([b"frame".as_slice()]);
        std::fs::write(dir.join("airhorn_default.dca"), raw).unwrap();

        let data = data_for(&dir);
        assert!(data.catalog().await.is_empty());

        let loaded = data.reload_catalog().await.unwrap();
        assert_eq!(loaded.clip_count(), 1);

        std::fs::remove_dir_all(&dir).unwrap();
        assert!(data.reload_catalog().await.is_err());

        let current = data.catalog().await;
        assert!(Arc::ptr_eq(&current, &loaded));
        assert!(current.collection("airhorn").is_some());
    }
}
