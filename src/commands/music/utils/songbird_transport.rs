//! Voice transport backed by songbird and the serenity cache.

use poise::serenity_prelude as serenity;
use serenity::async_trait;
use serenity::prelude::Mutex as SerenityMutex;
use serenity::{Cache, ChannelId, GuildId, UserId};
use songbird::tracks::{ControlError, PlayMode, ReadyState, TrackHandle};
use songbird::{Call, CoreEvent, Event, Songbird, TrackEvent};
use std::sync::Arc;
use tracing::{debug, info};

use super::event_handlers::{DriverStatusNotifier, TrackEndNotifier};
use super::music_manager::{MusicError, MusicResult};
use super::playback::{AudioPlayer, AudioResource, IdleNotifier, PlayerState};
use super::voice::{ConnectionStatus, StatusTracker, VoiceConnection, VoiceTransport};

pub struct SongbirdTransport {
    songbird: Arc<Songbird>,
    cache: Arc<Cache>,
}

impl SongbirdTransport {
    pub fn new(songbird: Arc<Songbird>, cache: Arc<Cache>) -> Self {
        Self { songbird, cache }
    }
}

#[async_trait]
impl VoiceTransport for SongbirdTransport {
    fn member_voice_channel(&self, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
        let guild = self.cache.guild(guild_id)?;
        guild.voice_states.get(&user_id)?.channel_id
    }

    async fn join(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        status: StatusTracker,
    ) -> MusicResult<Arc<dyn VoiceConnection>> {
        let call = self
            .songbird
            .join(guild_id, channel_id)
            .await
            .map_err(|e| MusicError::ConnectionFailure(e.to_string()))?;

        {
            let mut handler = call.lock().await;
            let notifier = DriverStatusNotifier {
                guild_id,
                status: status.clone(),
            };
            for event in [
                CoreEvent::DriverConnect,
                CoreEvent::DriverReconnect,
                CoreEvent::DriverDisconnect,
            ] {
                handler.add_global_event(Event::Core(event), notifier.clone());
            }
        }

        // `join` only returns once the driver is connected
        status.set(ConnectionStatus::Ready);
        info!("Joined voice channel {} in guild {}", channel_id, guild_id);

        Ok(Arc::new(SongbirdConnection {
            guild_id,
            songbird: self.songbird.clone(),
            call,
        }))
    }
}

pub struct SongbirdConnection {
    guild_id: GuildId,
    songbird: Arc<Songbird>,
    call: Arc<SerenityMutex<Call>>,
}

fn control_error(e: impl std::fmt::Display) -> MusicError {
    MusicError::PlayerControl(e.to_string())
}

#[async_trait]
impl VoiceConnection for SongbirdConnection {
    async fn subscribe(
        &self,
        resource: AudioResource,
        on_idle: IdleNotifier,
    ) -> MusicResult<Box<dyn AudioPlayer>> {
        let volume = resource.volume;
        let track = {
            let mut handler = self.call.lock().await;
            handler.play_input(resource.into_input())
        };

        let subscribe_error = |e: ControlError| {
            MusicError::ConnectionFailure(format!("Failed to set up player: {}", e))
        };
        track.set_volume(volume).map_err(subscribe_error)?;

        let notifier = TrackEndNotifier {
            guild_id: self.guild_id,
            notifier: on_idle,
        };
        track
            .add_event(Event::Track(TrackEvent::End), notifier.clone())
            .map_err(subscribe_error)?;
        track
            .add_event(Event::Track(TrackEvent::Error), notifier)
            .map_err(subscribe_error)?;

        debug!("Subscribed new player in guild {}", self.guild_id);
        Ok(Box::new(SongbirdPlayer { track }))
    }

    async fn destroy(&self) -> MusicResult<()> {
        self.songbird
            .remove(self.guild_id)
            .await
            .map_err(|e| MusicError::ConnectionFailure(e.to_string()))
    }
}

/// One songbird track.
pub struct SongbirdPlayer {
    track: TrackHandle,
}

#[async_trait]
impl AudioPlayer for SongbirdPlayer {
    async fn state(&self) -> PlayerState {
        match self.track.get_info().await {
            Ok(info) => match (&info.playing, &info.ready) {
                (PlayMode::Play, ReadyState::Playable) => PlayerState::Playing,
                (PlayMode::Play, _) => PlayerState::Buffering,
                (PlayMode::Pause, _) => PlayerState::Paused,
                _ => PlayerState::Idle,
            },
            // The track is gone from the mixer
            Err(_) => PlayerState::Idle,
        }
    }

    fn pause(&self) -> MusicResult<()> {
        self.track.pause().map_err(control_error)
    }

    fn unpause(&self) -> MusicResult<()> {
        self.track.play().map_err(control_error)
    }

    fn stop(&self) -> MusicResult<()> {
        self.track.stop().map_err(control_error)
    }

    fn set_volume(&self, volume: f32) -> MusicResult<()> {
        self.track.set_volume(volume).map_err(control_error)
    }
}
