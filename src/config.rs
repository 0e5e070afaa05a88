use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Command line flags. Each one overrides the matching config key.
#[derive(Debug, Default, Parser)]
#[command(name = "airhorn", version, about = "Discord soundboard bot")]
pub struct Cli {
    /// Discord authentication token
    #[arg(short = 't', long)]
    pub token: Option<String>,
    /// Shard ID
    #[arg(short = 's', long)]
    pub shard: Option<u32>,
    /// Number of shards
    #[arg(short = 'c', long, allow_negative_numbers = true)]
    pub shard_count: Option<i64>,
    /// Owner user ID, allowed to reload sounds
    #[arg(short = 'o', long)]
    pub owner: Option<u64>,
    /// Prefix for commands
    #[arg(short = 'p', long)]
    pub prefix: Option<String>,
    /// Directory holding the clip files
    #[arg(short = 'a', long)]
    pub audio_dir: Option<PathBuf>,
}

/// Discord connection settings
#[derive(Debug, Deserialize, Clone)]
pub struct DiscordConfig {
    /// Bot token
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub shard_id: u32,
    /// Values below 1 mean a single shard
    #[serde(default = "default_shard_count")]
    pub shard_count: i64,
    /// User allowed to run privileged commands
    #[serde(default)]
    pub owner_id: Option<u64>,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_shard_count() -> i64 {
    1
}

fn default_prefix() -> String {
    "!".to_string()
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            shard_id: 0,
            shard_count: default_shard_count(),
            owner_id: None,
            prefix: default_prefix(),
        }
    }
}

impl DiscordConfig {
    /// Total shard count, never less than one.
    pub fn shards(&self) -> u32 {
        u32::try_from(self.shard_count).ok().filter(|&n| n > 0).unwrap_or(1)
    }

    pub fn is_owner(&self, user_id: u64) -> bool {
        self.owner_id == Some(user_id)
    }
}

/// Clip repository settings
#[derive(Debug, Deserialize, Clone)]
pub struct AudioConfig {
    #[serde(default = "default_audio_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_audio_dir() -> PathBuf {
    PathBuf::from("audio")
}

fn default_extension() -> String {
    "dca".to_string()
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            dir: default_audio_dir(),
            extension: default_extension(),
        }
    }
}

/// Playback pacing, in milliseconds
#[derive(Debug, Deserialize, Clone)]
pub struct PlaybackConfig {
    #[serde(default = "default_join_delay")]
    pub join_delay_ms: u64,
    #[serde(default = "default_switch_delay")]
    pub switch_delay_ms: u64,
    #[serde(default = "default_preroll")]
    pub preroll_ms: u64,
    #[serde(default = "default_inter_clip")]
    pub inter_clip_ms: u64,
    #[serde(default = "default_idle_disconnect")]
    pub idle_disconnect_ms: u64,
    /// DM the requester when their play is dropped because the queue is full
    #[serde(default)]
    pub notify_on_drop: bool,
}

fn default_join_delay() -> u64 {
    175
}

fn default_switch_delay() -> u64 {
    250
}

fn default_preroll() -> u64 {
    50
}

fn default_inter_clip() -> u64 {
    25
}

fn default_idle_disconnect() -> u64 {
    250
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            join_delay_ms: default_join_delay(),
            switch_delay_ms: default_switch_delay(),
            preroll_ms: default_preroll(),
            inter_clip_ms: default_inter_clip(),
            idle_disconnect_ms: default_idle_disconnect(),
            notify_on_drop: false,
        }
    }
}

/// Root application configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

impl AppConfig {
    /// Load configuration from files, environment variables and flags
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., AIRHORN_DISCORD__TOKEN, AIRHORN_PLAYBACK__NOTIFY_ON_DROP
            .add_source(
                Environment::with_prefix("AIRHORN")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("discord.token", cli.token.clone())?
            .set_override_option("discord.shard_id", cli.shard.map(|v| v.to_string()))?
            .set_override_option("discord.shard_count", cli.shard_count.map(|v| v.to_string()))?
            .set_override_option("discord.owner_id", cli.owner.map(|v| v.to_string()))?
            .set_override_option("discord.prefix", cli.prefix.clone())?
            .set_override_option(
                "audio.dir",
                cli.audio_dir.as_ref().map(|p| p.display().to_string()),
            )?
            .build()?;

        config.try_deserialize()
    }

    /// Initialize the global config singleton
    pub fn init(cli: &Cli) -> Result<&'static Self, ConfigError> {
        let config = Self::load(cli)?;
        Ok(CONFIG.get_or_init(|| config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_count_floor() {
        let mut discord = DiscordConfig::default();
        assert_eq!(discord.shards(), 1);

        discord.shard_count = 0;
        assert_eq!(discord.shards(), 1);

        discord.shard_count = -3;
        assert_eq!(discord.shards(), 1);

        discord.shard_count = 4;
        assert_eq!(discord.shards(), 4);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "airhorn", "-t", "secret", "-s", "2", "-c", "0", "-o", "1234", "-p", "?",
        ]);
        let config = AppConfig::load(&cli).unwrap();

        assert_eq!(config.discord.token, "secret");
        assert_eq!(config.discord.shard_id, 2);
        assert_eq!(config.discord.shards(), 1);
        assert!(config.discord.is_owner(1234));
        assert!(!config.discord.is_owner(99));
        assert_eq!(config.discord.prefix, "?");
        assert_eq!(config.audio.dir, PathBuf::from("audio"));
        assert_eq!(config.playback.join_delay_ms, 175);
    }
}
