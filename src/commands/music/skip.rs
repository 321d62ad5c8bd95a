use super::{guild_session, reply_failure};
use crate::{CommandResult, Context};

/// Skip the currently playing song
#[poise::command(slash_command, prefix_command, category = "Music")]
pub async fn skip(ctx: Context<'_>) -> CommandResult {
    let skipped = match guild_session(ctx).await {
        Ok(session) => session.skip().await,
        Err(err) => Err(err),
    };

    match skipped {
        Ok(true) => {
            ctx.say("⏭️ Skipped to the next track").await?;
        }
        Ok(false) => {
            ctx.say("Nothing is playing").await?;
        }
        Err(err) => reply_failure(ctx, &err).await?,
    }

    Ok(())
}
