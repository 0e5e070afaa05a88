//! Slash commands.

use crate::bot::Data;

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Get all registered commands
pub fn all_commands() -> Vec<poise::Command<Data, Error>> {
    vec![sounds(), reload()]
}

/// List every sound collection and its clips
#[poise::command(slash_command)]
pub async fn sounds(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let catalog = data.catalog().await;

    let content = if catalog.is_empty() {
        "No sounds are loaded.".to_string()
    } else {
        catalog.help_text(&data.config.discord.prefix)
    };

    ctx.send(poise::CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

/// Reload sounds from disk
#[poise::command(slash_command, owners_only, hide_in_help)]
pub async fn reload(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let catalog = ctx.data().reload_catalog().await?;

    ctx.say(format!(
        "Reloaded {} sounds in {} collections.",
        catalog.clip_count(),
        catalog.collections().len()
    ))
    .await?;
    Ok(())
}
