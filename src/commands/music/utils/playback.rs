//! The playback engine: one audio player per guild, started song by song from the queue.
//!
//! Players never report back by calling into the engine. When one goes idle it sends a
//! [`PlayerEvent`] tagged with the generation of the `play` call that created it; the
//! owning session feeds those events back through [`PlaybackEngine::on_idle`]. Events from
//! a player that has since been replaced are ignored.

use poise::serenity_prelude::GuildId;
use serenity::async_trait;
use songbird::input::Input;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::messages::{self, ReplySink};
use super::music_manager::MusicResult;
use super::queue_manager::Queue;
use super::voice::VoiceTransport;
use super::voice_manager::VoiceManager;
use crate::commands::music::audio_sources::{AudioStream, AudioStreamer, SongRequest};

/// Gain applied to new players unless configured otherwise.
pub const DEFAULT_VOLUME: f32 = 0.1;

/// Status of an audio player as reported by the audio backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// Finished, stopped or failed; nothing left to play.
    Idle,
    Buffering,
    Playing,
    Paused,
    /// Paused by the backend because nobody is listening.
    AutoPaused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Idle { generation: u64 },
}

/// Handed to a voice connection with each new player; signals when that player goes idle.
#[derive(Debug, Clone)]
pub struct IdleNotifier {
    events: mpsc::UnboundedSender<PlayerEvent>,
    generation: u64,
}

impl IdleNotifier {
    pub fn new(events: mpsc::UnboundedSender<PlayerEvent>, generation: u64) -> Self {
        Self { events, generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn notify(&self) {
        let event = PlayerEvent::Idle {
            generation: self.generation,
        };
        if self.events.send(event).is_err() {
            debug!(
                "Player {} went idle after its session was dropped",
                self.generation
            );
        }
    }
}

/// An opened stream wrapped for playback with an inline volume.
pub struct AudioResource {
    pub stream: AudioStream,
    pub volume: f32,
}

impl AudioResource {
    pub fn new(stream: AudioStream, volume: f32) -> Self {
        Self { stream, volume }
    }

    pub fn into_input(self) -> Input {
        self.stream.input
    }
}

/// Control surface of a single started player.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn state(&self) -> PlayerState;
    fn pause(&self) -> MusicResult<()>;
    fn unpause(&self) -> MusicResult<()>;
    fn stop(&self) -> MusicResult<()>;
    fn set_volume(&self, volume: f32) -> MusicResult<()>;
}

/// What a call into the engine ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// A new player started for the song with this title.
    Started(String),
    Resumed,
    /// A song is already playing; the queue will get to the new entry.
    Busy,
    Buffering,
    /// Nothing left in the queue.
    Dormant,
    /// The idle event came from a player that has been replaced, or was already handled.
    Stale,
}

pub struct PlaybackEngine {
    guild_id: GuildId,
    streamer: Arc<dyn AudioStreamer>,
    voices: Arc<VoiceManager>,
    events: mpsc::UnboundedSender<PlayerEvent>,
    player: Option<Box<dyn AudioPlayer>>,
    /// Generation of the current player.
    generation: u64,
    /// Last generation whose going idle already moved the queue on.
    advanced_past: u64,
    volume: f32,
    /// Where "Now playing" notices go, captured from the request that started playback.
    announcer: Option<Arc<dyn ReplySink>>,
}

impl PlaybackEngine {
    pub fn new(
        guild_id: GuildId,
        streamer: Arc<dyn AudioStreamer>,
        voices: Arc<VoiceManager>,
        events: mpsc::UnboundedSender<PlayerEvent>,
        volume: f32,
    ) -> Self {
        Self {
            guild_id,
            streamer,
            voices,
            events,
            player: None,
            generation: 0,
            advanced_past: 0,
            volume,
            announcer: None,
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Route "Now playing" notices for the songs started from now on.
    pub fn announce_to(&mut self, announcer: Arc<dyn ReplySink>) {
        self.announcer = Some(announcer);
    }

    pub async fn announce(&self, text: &str) {
        if let Some(announcer) = &self.announcer {
            announcer.send(text).await;
        }
    }

    /// State of the current player, `None` before the first song started.
    pub async fn state(&self) -> Option<PlayerState> {
        match &self.player {
            Some(player) => Some(player.state().await),
            None => None,
        }
    }

    /// Make sure the queue is being played, starting or resuming as needed.
    pub async fn attempt_play(
        &mut self,
        client: &dyn VoiceTransport,
        queue: &mut Queue<SongRequest>,
        announcer: Arc<dyn ReplySink>,
    ) -> MusicResult<PlayOutcome> {
        match self.state().await {
            None => {
                self.announce_to(announcer);
                self.play_current(client, queue).await
            }
            Some(PlayerState::Paused | PlayerState::AutoPaused) => {
                self.resume().await?;
                Ok(PlayOutcome::Resumed)
            }
            Some(PlayerState::Idle) => {
                if let Some(player) = &self.player {
                    if let Err(e) = player.stop() {
                        debug!("Idle player for guild {} refused stop: {}", self.guild_id, e);
                    }
                }
                // The player finished but its idle event is still queued
                if self.advanced_past != self.generation {
                    debug!(
                        "Advancing past player {} in guild {} ahead of its idle event",
                        self.generation, self.guild_id
                    );
                    self.advanced_past = self.generation;
                    queue.advance();
                }
                self.announce_to(announcer);
                self.play_current(client, queue).await
            }
            // TODO: let the requester know the player is still buffering
            Some(PlayerState::Buffering) => Ok(PlayOutcome::Buffering),
            Some(PlayerState::Playing) => Ok(PlayOutcome::Busy),
        }
    }

    /// Start the queue's current entry, or report the queue as exhausted.
    pub async fn play_current(
        &mut self,
        client: &dyn VoiceTransport,
        queue: &Queue<SongRequest>,
    ) -> MusicResult<PlayOutcome> {
        match queue.current() {
            Some(request) => {
                self.play(client, request).await?;
                Ok(PlayOutcome::Started(request.title().to_string()))
            }
            None => {
                debug!("Nothing queued to play for guild {}", self.guild_id);
                Ok(PlayOutcome::Dormant)
            }
        }
    }

    /// Start a new player for `request`, replacing the current one.
    ///
    /// On failure the current player, if any, stays in charge.
    pub async fn play(
        &mut self,
        client: &dyn VoiceTransport,
        request: &SongRequest,
    ) -> MusicResult<()> {
        let generation = self.generation + 1;
        info!(
            "Starting '{}' for guild {} (player {})",
            request.title(),
            self.guild_id,
            generation
        );

        let stream = self
            .streamer
            .stream(&request.song.url)
            .await
            .inspect_err(|e| {
                error!(
                    "Failed to open stream for '{}' in guild {}: {}",
                    request.title(),
                    self.guild_id,
                    e
                )
            })?;
        let resource = AudioResource::new(stream, self.volume);

        let voice = self
            .voices
            .ensure_connected(client, self.guild_id, request.requested_by.id)
            .await?;

        let notifier = IdleNotifier::new(self.events.clone(), generation);
        let player = voice.subscribe(resource, notifier).await.inspect_err(|e| {
            error!(
                "Failed to subscribe player for '{}' in guild {}: {}",
                request.title(),
                self.guild_id,
                e
            )
        })?;

        self.generation = generation;
        if let Some(previous) = self.player.replace(player) {
            if previous.state().await != PlayerState::Idle {
                if let Err(e) = previous.stop() {
                    debug!("Previous player for guild {} refused stop: {}", self.guild_id, e);
                }
            }
        }

        self.announce(&messages::now_playing(request.title())).await;
        Ok(())
    }

    /// React to a player going idle: advance the queue and play what comes next.
    pub async fn on_idle(
        &mut self,
        client: &dyn VoiceTransport,
        queue: &mut Queue<SongRequest>,
        generation: u64,
    ) -> MusicResult<PlayOutcome> {
        if generation != self.generation || generation == self.advanced_past {
            debug!(
                "Ignoring idle event from player {} in guild {}",
                generation, self.guild_id
            );
            return Ok(PlayOutcome::Stale);
        }
        self.advanced_past = generation;

        match queue.advance() {
            Some(next) => {
                self.play(client, next).await?;
                Ok(PlayOutcome::Started(next.title().to_string()))
            }
            None => {
                info!("Queue finished for guild {}", self.guild_id);
                Ok(PlayOutcome::Dormant)
            }
        }
    }

    /// Force the current player idle; auto-advance picks the next entry.
    pub async fn skip(&self) -> MusicResult<bool> {
        let Some(player) = &self.player else {
            return Ok(false);
        };
        if player.state().await == PlayerState::Idle {
            return Ok(false);
        }

        player.stop().inspect_err(|e| {
            error!("Failed to stop player for guild {}: {}", self.guild_id, e)
        })?;
        Ok(true)
    }

    pub async fn pause(&self) -> MusicResult<bool> {
        let Some(player) = &self.player else {
            return Ok(false);
        };

        match player.state().await {
            PlayerState::Playing | PlayerState::Buffering => {
                player.pause().inspect_err(|e| {
                    error!("Failed to pause player for guild {}: {}", self.guild_id, e)
                })?;
                Ok(true)
            }
            PlayerState::Paused
            | PlayerState::AutoPaused
            | PlayerState::Idle => Ok(false),
        }
    }

    pub async fn resume(&self) -> MusicResult<bool> {
        let Some(player) = &self.player else {
            return Ok(false);
        };

        match player.state().await {
            PlayerState::Paused | PlayerState::AutoPaused => {
                player.unpause().inspect_err(|e| {
                    error!("Failed to resume player for guild {}: {}", self.guild_id, e)
                })?;
                Ok(true)
            }
            PlayerState::Playing | PlayerState::Buffering | PlayerState::Idle => Ok(false),
        }
    }

    /// Change the gain of the current player and of every later one.
    pub async fn set_volume(&mut self, volume: f32) -> MusicResult<()> {
        self.volume = volume;

        if let Some(player) = &self.player {
            if player.state().await != PlayerState::Idle {
                player.set_volume(volume).inspect_err(|e| {
                    error!("Failed to set volume for guild {}: {}", self.guild_id, e)
                })?;
            }
        }
        Ok(())
    }

    /// Drop the current player. Its pending idle event becomes stale.
    pub async fn reset(&mut self) {
        self.generation += 1;
        self.announcer = None;

        if let Some(player) = self.player.take() {
            if player.state().await != PlayerState::Idle {
                if let Err(e) = player.stop() {
                    debug!("Player for guild {} refused stop: {}", self.guild_id, e);
                }
            }
        }
    }
}
