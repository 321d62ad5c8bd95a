use poise::serenity_prelude as serenity;
use serenity::GuildId;
use serenity::async_trait;
use songbird::tracks::PlayMode;
use songbird::{Event, EventContext, EventHandler};
use tracing::{debug, info, warn};

use super::playback::IdleNotifier;
use super::voice::{ConnectionStatus, StatusTracker};

/// Event handler for when a track ends or fails
#[derive(Clone)]
pub struct TrackEndNotifier {
    pub guild_id: GuildId,
    pub notifier: IdleNotifier,
}

#[async_trait]
impl EventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(tracks) = ctx {
            for (state, _) in tracks.iter() {
                if let PlayMode::Errored(e) = &state.playing {
                    warn!("Track failed in guild {}: {}", self.guild_id, e);
                }
            }
            debug!(
                "Player {} went idle in guild {}",
                self.notifier.generation(),
                self.guild_id
            );
            self.notifier.notify();
        }
        None
    }
}

/// Mirrors voice driver events into a connection's status.
#[derive(Clone)]
pub struct DriverStatusNotifier {
    pub guild_id: GuildId,
    pub status: StatusTracker,
}

#[async_trait]
impl EventHandler for DriverStatusNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        // A destroyed or superseded session has no more use for driver events
        if self.status.get() == ConnectionStatus::Destroyed {
            return Some(Event::Cancel);
        }

        match ctx {
            EventContext::DriverConnect(_) | EventContext::DriverReconnect(_) => {
                self.status.set(ConnectionStatus::Ready);
            }
            EventContext::DriverDisconnect(data) => {
                info!(
                    "Voice driver disconnected in guild {}: {:?}",
                    self.guild_id, data.reason
                );
                self.status.set(ConnectionStatus::Disconnected);
            }
            _ => {}
        }
        None
    }
}
