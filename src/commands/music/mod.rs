pub mod audio_sources;
pub mod utils;

pub mod leave;
pub mod pause;
pub mod play;
pub mod queue;
pub mod resume;
pub mod skip;
pub mod volume;

use poise::CreateReply;
use std::sync::Arc;

use crate::{CommandResult, Context};
use utils::messages;
use utils::music_manager::{MusicError, MusicSession};

/// The music session of the guild the command was issued in
async fn guild_session(ctx: Context<'_>) -> Result<Arc<MusicSession>, MusicError> {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;
    Ok(ctx.data().music.session(guild_id).await)
}

/// Turn a failed music operation into a reply only the invoking user sees
async fn reply_failure(ctx: Context<'_>, err: &MusicError) -> CommandResult {
    ctx.send(
        CreateReply::default()
            .content(messages::failure(err))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}
