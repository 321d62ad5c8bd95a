use poise::{CreateReply, serenity_prelude as serenity};
use serenity::CreateEmbed;
use std::time::Duration;

use crate::{CommandResult, Context};

/// Ping the bot to check its latency
#[poise::command(slash_command, prefix_command, category = "General")]
pub async fn ping(ctx: Context<'_>) -> CommandResult {
    let latency = get_shard_latency(&ctx)
        .await
        .unwrap_or_default()
        .as_millis();

    let embed = CreateEmbed::new()
        .title("Pong!")
        .field("Gateway Latency", format!("{} ms", latency), false);

    ctx.send(CreateReply::default().embed(embed)).await?;

    Ok(())
}

async fn get_shard_latency(ctx: &Context<'_>) -> Option<Duration> {
    let shard_manager = ctx.framework().shard_manager().clone();
    let runners = shard_manager.runners.lock().await;

    // Latency is tracked per shard runner; use the one this command came in on.
    let runner = runners.get(&ctx.serenity_context().shard_id)?;

    runner.latency
}
