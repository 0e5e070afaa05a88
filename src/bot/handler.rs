use crate::bot::Data;
use crate::catalog::{resolve_command, ResolveError};
use crate::playback::{EnqueueOutcome, PlayRequest};
use poise::serenity_prelude::{self as serenity, Context, Message};
use tracing::{debug, error, info, warn};

const NOT_IN_VOICE: &str = "Could not play the sound requested. Are you in a voice channel?";
const QUEUE_FULL: &str = "Too many sounds queued in this server. Try again in a moment.";

/// A text command that is not a sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Reload,
}

impl Command {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "help" => Some(Self::Help),
            "reload" => Some(Self::Reload),
            _ => None,
        }
    }
}

/// What an inbound message is asking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent<'a> {
    /// `help` / `reload`, from a DM or a mention.
    Command(&'a str),
    /// Text after the sound prefix.
    Play(&'a str),
    Ignore,
}

/// Who a message mentions first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mention {
    Nobody,
    Bot,
    Other,
}

/// Classify lowercased message content.
///
/// Guild messages that mention someone other than the bot are ignored.
pub fn classify<'a>(content: &'a str, prefix: &str, in_guild: bool, mention: Mention) -> Intent<'a> {
    if !in_guild || mention == Mention::Bot {
        Intent::Command(content.trim())
    } else if mention == Mention::Other {
        Intent::Ignore
    } else if let Some(rest) = content.strip_prefix(prefix) {
        Intent::Play(rest)
    } else {
        Intent::Ignore
    }
}

/// Remove `<@id>` and `<@!id>` mentions of the bot.
pub fn strip_mention(content: &str, bot_id: u64) -> String {
    content
        .replace(&format!("<@{}>", bot_id), "")
        .replace(&format!("<@!{}>", bot_id), "")
}

/// Handle incoming messages
pub async fn handle_message(ctx: &Context, msg: &Message, data: &Data) {
    // Ignore bot messages, ourselves included
    if msg.author.bot {
        return;
    }

    let bot_id = ctx.cache.current_user().id;
    let mention = match msg.mentions.first() {
        None => Mention::Nobody,
        Some(user) if user.id == bot_id => Mention::Bot,
        Some(_) => Mention::Other,
    };

    let content = if mention == Mention::Bot {
        strip_mention(&msg.content, bot_id.get()).to_lowercase()
    } else {
        msg.content.to_lowercase()
    };

    let prefix = &data.config.discord.prefix;
    match classify(&content, prefix, msg.guild_id.is_some(), mention) {
        Intent::Command(text) => {
            if let Some(command) = Command::parse(text) {
                run_command(ctx, msg, data, command).await;
            }
        }
        Intent::Play(text) => {
            if let Some(guild_id) = msg.guild_id {
                play(ctx, msg, data, guild_id, text).await;
            }
        }
        Intent::Ignore => {}
    }
}

async fn run_command(ctx: &Context, msg: &Message, data: &Data, command: Command) {
    match command {
        Command::Help => {
            let catalog = data.catalog().await;
            let help = catalog.help_text(&data.config.discord.prefix);
            if let Err(e) = msg.channel_id.say(&ctx.http, help).await {
                error!("Failed to send help: {}", e);
            }
        }
        Command::Reload => {
            if !data.config.discord.is_owner(msg.author.id.get()) {
                debug!(user_id = msg.author.id.get(), "Ignoring reload from non-owner");
                return;
            }

            let reply = match data.reload_catalog().await {
                Ok(catalog) => format!(
                    "Reloaded {} sounds in {} collections.",
                    catalog.clip_count(),
                    catalog.collections().len()
                ),
                Err(e) => {
                    error!("Failed to reload sounds: {}", e);
                    format!("Reload failed, keeping the current sounds: {}", e)
                }
            };
            dm(ctx, &msg.author, &reply).await;
        }
    }
}

async fn play(ctx: &Context, msg: &Message, data: &Data, guild_id: serenity::GuildId, text: &str) {
    let catalog = data.catalog().await;

    let clips = match resolve_command(text, &catalog) {
        Ok(clips) => clips,
        Err(ResolveError::Empty) => return,
        Err(e) => {
            dm(ctx, &msg.author, &e.to_string()).await;
            return;
        }
    };

    let Some(channel_id) = user_voice_channel(ctx, guild_id, msg.author.id) else {
        warn!(
            user_id = msg.author.id.get(),
            guild_id = guild_id.get(),
            "Failed to find channel to play sound in"
        );
        dm(ctx, &msg.author, NOT_IN_VOICE).await;
        return;
    };

    let request = match PlayRequest::new(guild_id.get(), channel_id.get(), clips) {
        Ok(request) => request,
        Err(e) => {
            error!("Invalid play request: {}", e);
            return;
        }
    };

    let outcome = data.registry.enqueue(request).await;
    info!(guild_id = guild_id.get(), outcome = ?outcome, "Play requested");

    if outcome == EnqueueOutcome::Dropped && data.config.playback.notify_on_drop {
        dm(ctx, &msg.author, QUEUE_FULL).await;
    }
}

/// Find the voice channel a user is currently in.
fn user_voice_channel(
    ctx: &Context,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
) -> Option<serenity::ChannelId> {
    let guild = ctx.cache.guild(guild_id)?;
    guild.voice_states.get(&user_id).and_then(|vs| vs.channel_id)
}

async fn dm(ctx: &Context, user: &serenity::User, content: &str) {
    let builder = serenity::CreateMessage::new().content(content);
    if let Err(e) = user.direct_message(ctx, builder).await {
        warn!(user_id = user.id.get(), "Failed to send direct message: {}", e);
    }
}

/// Handle guild join event
pub fn handle_guild_create(guild: &serenity::Guild) {
    info!("Joined guild: {} ({})", guild.name, guild.id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_prefixed_play() {
        assert_eq!(
            classify("!airhorn reverb", "!", true, Mention::Nobody),
            Intent::Play("airhorn reverb")
        );
        assert_eq!(classify("hello there", "!", true, Mention::Nobody), Intent::Ignore);
        assert_eq!(classify("?airhorn", "?", true, Mention::Nobody), Intent::Play("airhorn"));
    }

    #[test]
    fn test_classify_commands() {
        assert_eq!(classify("help", "!", false, Mention::Nobody), Intent::Command("help"));
        assert_eq!(classify("  help ", "!", true, Mention::Bot), Intent::Command("help"));
        // DMs never play sounds
        assert_eq!(classify("!airhorn", "!", false, Mention::Nobody), Intent::Command("!airhorn"));
    }

    #[test]
    fn test_classify_ignores_guild_mentions_of_others() {
        assert_eq!(classify("<@7> !airhorn", "!", true, Mention::Other), Intent::Ignore);
        assert_eq!(classify("!airhorn <@7>", "!", true, Mention::Other), Intent::Ignore);
        // In a DM a mention still reaches the command parser
        assert_eq!(classify("help", "!", false, Mention::Other), Intent::Command("help"));
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(Command::parse("help"), Some(Command::Help));
        assert_eq!(Command::parse(" reload "), Some(Command::Reload));
        assert_eq!(Command::parse("airhorn"), None);
    }

    #[test]
    fn test_strip_mention() {
        assert_eq!(strip_mention("<@42> help", 42).trim(), "help");
        assert_eq!(strip_mention("<@!42> reload", 42).trim(), "reload");
        assert_eq!(strip_mention("<@7> help", 42), "<@7> help");
    }
}
