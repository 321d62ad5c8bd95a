use super::{guild_session, reply_failure};
use crate::{CommandResult, Context};

/// Pause the current track
#[poise::command(slash_command, prefix_command, category = "Music")]
pub async fn pause(ctx: Context<'_>) -> CommandResult {
    let paused = match guild_session(ctx).await {
        Ok(session) => session.pause().await,
        Err(err) => Err(err),
    };

    match paused {
        Ok(true) => {
            ctx.say("⏸️ Paused").await?;
        }
        Ok(false) => {
            ctx.say("Nothing is playing").await?;
        }
        Err(err) => reply_failure(ctx, &err).await?,
    }

    Ok(())
}
