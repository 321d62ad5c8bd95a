use super::{guild_session, reply_failure};
use crate::{CommandResult, Context};

/// Set the playback volume
#[poise::command(slash_command, prefix_command, aliases("v"), category = "Music")]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "Volume in percent"]
    #[min = 0]
    #[max = 100]
    percent: u8,
) -> CommandResult {
    let changed = match guild_session(ctx).await {
        Ok(session) => session.set_volume(percent).await,
        Err(err) => Err(err),
    };

    match changed {
        Ok(()) => {
            ctx.say(format!("🔊 Volume set to {}%", percent)).await?;
        }
        Err(err) => reply_failure(ctx, &err).await?,
    }

    Ok(())
}
