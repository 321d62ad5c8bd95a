use super::{guild_session, reply_failure};
use crate::{CommandResult, Context};

/// Resume the paused track
#[poise::command(slash_command, prefix_command, category = "Music")]
pub async fn resume(ctx: Context<'_>) -> CommandResult {
    let resumed = match guild_session(ctx).await {
        Ok(session) => session.resume().await,
        Err(err) => Err(err),
    };

    match resumed {
        Ok(true) => {
            ctx.say("▶️ Resumed").await?;
        }
        Ok(false) => {
            ctx.say("Nothing is paused").await?;
        }
        Err(err) => reply_failure(ctx, &err).await?,
    }

    Ok(())
}
