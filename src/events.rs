use poise::serenity_prelude as serenity;
use serenity::{ChannelId, FullEvent, Message, VoiceState};
use tracing::{debug, info};

use crate::commands::music::utils::voice::ConnectionStatus;
use crate::{Data, Error};

/// Gateway events the framework does not turn into commands
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            info!("Logged in as {}", data_about_bot.user.name);
        }
        FullEvent::Message { new_message } if data.config.log_messages => {
            log_message(new_message);
        }
        FullEvent::VoiceStateUpdate { old, new } if new.user_id == ctx.cache.current_user().id => {
            bot_voice_state(old.as_ref(), new, data);
        }
        FullEvent::VoiceServerUpdate { event } => {
            if let Some(guild_id) = event.guild_id {
                debug!("Voice server assigned for guild {}", guild_id);
                data.music
                    .voices()
                    .report(guild_id, ConnectionStatus::Connecting);
            }
        }
        _ => {}
    }
    Ok(())
}

fn log_message(message: &Message) {
    let content = if message.content.is_empty() {
        "*replied*"
    } else {
        message.content.as_str()
    };
    info!("[{}] {}", message.author.name, content);
}

/// The bot's own voice state changed: it is either re-signalling or gone.
fn bot_voice_state(old: Option<&VoiceState>, new: &VoiceState, data: &Data) {
    let Some(guild_id) = new.guild_id else {
        return;
    };

    let old_channel = old.and_then(|state| state.channel_id);
    let Some(status) = voice_status_change(old_channel, new.channel_id) else {
        return;
    };
    debug!("Bot voice state in guild {} is now {:?}", guild_id, status);
    data.music.voices().report(guild_id, status);
}

/// Mute and deafen toggles keep the channel and say nothing about the connection.
fn voice_status_change(
    old_channel: Option<ChannelId>,
    new_channel: Option<ChannelId>,
) -> Option<ConnectionStatus> {
    match new_channel {
        None => Some(ConnectionStatus::Disconnected),
        Some(channel) if old_channel == Some(channel) => None,
        Some(_) => Some(ConnectionStatus::Signalling),
    }
}
