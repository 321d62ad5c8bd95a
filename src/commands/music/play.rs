use std::sync::Arc;
use tracing::info;

use super::audio_sources::Requester;
use super::utils::messages::{self, ChannelReplies};
use super::{guild_session, reply_failure};
use crate::{CommandResult, Context};

/// Play a song from YouTube or a direct URL
#[poise::command(slash_command, prefix_command, aliases("p"), category = "Music")]
pub async fn play(
    ctx: Context<'_>,
    #[description = "URL or search query"]
    #[rest]
    query: String,
) -> CommandResult {
    info!("Received play command with query: {}", query);
    let session = match guild_session(ctx).await {
        Ok(session) => session,
        Err(err) => return reply_failure(ctx, &err).await,
    };

    // Defer the response since searching and opening the stream might take time
    ctx.defer().await?;

    let replies = Arc::new(ChannelReplies::new(
        ctx.serenity_context().http.clone(),
        ctx.channel_id(),
    ));
    match session
        .add_song(&query, Requester::from(ctx.author()), replies)
        .await
    {
        Ok(title) => {
            ctx.say(messages::queued(&title)).await?;
        }
        Err(err) => reply_failure(ctx, &err).await?,
    }

    Ok(())
}
