use poise::serenity_prelude as serenity;
use serenity::ClientBuilder;
use songbird::SerenityInit;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use jukebox::commands::general::{deploy::*, ping::*};
use jukebox::commands::music::{
    leave::*, pause::*, play::*, queue::*, resume::*, skip::*, volume::*,
};
use jukebox::commands::music::utils::music_manager::MusicError;
use jukebox::commands::music::utils::songbird_transport::SongbirdTransport;
use jukebox::commands::music::utils::voice_manager::VoiceManager;
use jukebox::config::Config;
use jukebox::{CommandResult, Context, Data, Error, events};

#[poise::command(slash_command, prefix_command, category = "General")]
async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> CommandResult {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            show_context_menu_commands: true,
            ..Default::default()
        },
    )
    .await
    .map_err(|e| e.into())
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start the bot: {}", error)
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {}", ctx.command().name, error)
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e)
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("jukebox=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    let config = Config::load()?;
    info!("Loaded configuration: {:?}", config);

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let commands = vec![
        // General commands
        help(),
        ping(),
        deploy(),
        // Music commands
        play(),
        skip(),
        pause(),
        resume(),
        volume(),
        queue(),
        leave(),
    ];

    let voices = Arc::new(VoiceManager::new(config.reconnect_grace));
    let token = config.discord_token.clone();
    let prefix = config.command_prefix.clone();
    let setup_voices = voices.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(prefix),
                ..Default::default()
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(events::event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                if config.register_globally {
                    poise::builtins::register_globally(ctx, &framework.options().commands)
                        .await?;
                }

                let songbird = songbird::get(ctx)
                    .await
                    .ok_or(MusicError::NoVoiceManager)?;
                let transport = SongbirdTransport::new(songbird, ctx.cache.clone());

                Ok(Data::new(config, setup_voices, Arc::new(transport)))
            })
        })
        .build();

    let mut client = ClientBuilder::new(token, intents)
        .framework(framework)
        .register_songbird()
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down, leaving all voice channels");
            voices.destroy_all().await;
            shard_manager.shutdown_all().await;
        }
    });

    client.start().await.map_err(Into::into)
}
