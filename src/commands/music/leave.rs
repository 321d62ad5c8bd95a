use tracing::info;

use super::{guild_session, reply_failure};
use crate::{CommandResult, Context};

/// Stop playback, clear the queue and leave the voice channel
#[poise::command(slash_command, prefix_command, category = "Music")]
pub async fn leave(ctx: Context<'_>) -> CommandResult {
    let left = match guild_session(ctx).await {
        Ok(session) => session.leave().await,
        Err(err) => Err(err),
    };

    match left {
        Ok(()) => {
            info!("Left voice channel on request of {}", ctx.author().name);
            ctx.say("👋 Left the voice channel").await?;
        }
        Err(err) => reply_failure(ctx, &err).await?,
    }

    Ok(())
}
