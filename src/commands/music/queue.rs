use super::utils::messages;
use super::{guild_session, reply_failure};
use crate::{CommandResult, Context};

/// Show the current queue
#[poise::command(slash_command, prefix_command, category = "Music")]
pub async fn queue(ctx: Context<'_>) -> CommandResult {
    match guild_session(ctx).await {
        Ok(session) => {
            let snapshot = session.queue_snapshot().await;
            ctx.say(messages::queue_listing(&snapshot)).await?;
        }
        Err(err) => reply_failure(ctx, &err).await?,
    }

    Ok(())
}
