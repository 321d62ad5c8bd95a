use tracing::info;

use crate::commands::music::utils::music_manager::MusicError;
use crate::{CommandResult, Context};

/// Register the slash commands in this server
#[poise::command(prefix_command, hide_in_help, category = "General")]
pub async fn deploy(ctx: Context<'_>) -> CommandResult {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;
    let commands = &ctx.framework().options().commands;

    poise::builtins::register_in_guild(ctx.serenity_context(), commands, guild_id).await?;
    info!("Deployed {} commands to guild {}", commands.len(), guild_id);

    ctx.say(format!("Deployed {} commands", commands.len()))
        .await?;
    Ok(())
}
