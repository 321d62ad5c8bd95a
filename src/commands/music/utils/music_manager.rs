use dashmap::DashMap;
use poise::serenity_prelude::GuildId;
use std::sync::{Arc, Weak};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info};

use super::messages::{self, ReplySink};
use super::playback::{PlayOutcome, PlaybackEngine, PlayerEvent};
use super::queue_manager::Queue;
use super::song_resolver::SongResolver;
use super::voice::VoiceTransport;
use super::voice_manager::VoiceManager;
use crate::commands::music::audio_sources::youtube::{YtDlpSearcher, YtDlpStreamer};
use crate::commands::music::audio_sources::{
    AudioStreamer, Requester, SongRequest, SongSearcher,
};
use crate::config::Config;

/// Errors that can occur during music operations
#[derive(Error, Debug)]
pub enum MusicError {
    #[error("Music session used before it was initialized")]
    NotInitialized,

    #[error("No results found for '{0}'")]
    NotFound(String),

    #[error("User is not in a voice channel")]
    NoVoiceChannel,

    #[error("Voice connection failed: {0}")]
    ConnectionFailure(String),

    #[error("Audio stream failed: {0}")]
    StreamFailure(String),

    #[error("Search failed: {0}")]
    SearchFailure(String),

    #[error("Not in a guild")]
    NotInGuild,

    #[error("Not connected to a voice channel")]
    NotConnected,

    #[error("Player rejected the command: {0}")]
    PlayerControl(String),

    #[error("Volume must be between 0 and 100, got {0}")]
    InvalidVolume(u8),

    #[error("Failed to get voice manager")]
    NoVoiceManager,
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

/// Collaborators shared by the sessions of every guild.
#[derive(Clone)]
pub struct MusicServices {
    pub resolver: SongResolver,
    pub streamer: Arc<dyn AudioStreamer>,
    pub voices: Arc<VoiceManager>,
    /// Gain for new players, 0.0 to 1.0.
    pub default_volume: f32,
}

impl MusicServices {
    pub fn new(
        searcher: Arc<dyn SongSearcher>,
        streamer: Arc<dyn AudioStreamer>,
        voices: Arc<VoiceManager>,
        default_volume: f32,
    ) -> Self {
        Self {
            resolver: SongResolver::new(searcher),
            streamer,
            voices,
            default_volume,
        }
    }

    /// The yt-dlp backed providers, tuned by `config`.
    pub fn from_config(config: &Config, voices: Arc<VoiceManager>) -> Self {
        Self::new(
            Arc::new(YtDlpSearcher::new(config.search_results)),
            Arc::new(YtDlpStreamer::default()),
            voices,
            config.default_volume,
        )
    }
}

/// What the `queue` command shows.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSnapshot {
    pub current: Option<SongRequest>,
    pub upcoming: Vec<SongRequest>,
    /// How many entries were already played.
    pub played: usize,
    /// Volume in percent.
    pub volume: u8,
}

struct SessionState {
    client: Option<Arc<dyn VoiceTransport>>,
    queue: Queue<SongRequest>,
    engine: PlaybackEngine,
}

impl SessionState {
    fn client(&self) -> MusicResult<Arc<dyn VoiceTransport>> {
        self.client.clone().ok_or_else(|| {
            error!("Music session used before initialize");
            MusicError::NotInitialized
        })
    }
}

/// Queue, player and voice connection of one guild.
///
/// Every operation takes the session lock for its whole duration, so a `skip` issued
/// while a song is still being fetched waits for that song to start and then skips it.
pub struct MusicSession {
    guild_id: GuildId,
    resolver: SongResolver,
    voices: Arc<VoiceManager>,
    state: Mutex<SessionState>,
}

impl MusicSession {
    /// Create an uninitialized session and start its auto-advance loop.
    pub fn new(guild_id: GuildId, services: &MusicServices) -> Arc<Self> {
        let (events, receiver) = mpsc::unbounded_channel();
        let engine = PlaybackEngine::new(
            guild_id,
            services.streamer.clone(),
            services.voices.clone(),
            events,
            services.default_volume,
        );

        let session = Arc::new(Self {
            guild_id,
            resolver: services.resolver.clone(),
            voices: services.voices.clone(),
            state: Mutex::new(SessionState {
                client: None,
                queue: Queue::new(),
                engine,
            }),
        });
        tokio::spawn(Self::drive(Arc::downgrade(&session), receiver));
        session
    }

    /// Feed player events back into the session until it is dropped.
    async fn drive(session: Weak<Self>, mut events: mpsc::UnboundedReceiver<PlayerEvent>) {
        while let Some(PlayerEvent::Idle { generation }) = events.recv().await {
            let Some(session) = session.upgrade() else {
                break;
            };
            session.on_idle(generation).await;
        }
        debug!("Player event loop finished");
    }

    async fn on_idle(&self, generation: u64) {
        let mut state = self.state.lock().await;
        let Ok(client) = state.client() else {
            return;
        };

        let SessionState { queue, engine, .. } = &mut *state;
        match engine.on_idle(client.as_ref(), queue, generation).await {
            Ok(PlayOutcome::Started(title)) => {
                debug!("Auto-advanced to '{}' in guild {}", title, self.guild_id)
            }
            Ok(_) => {}
            Err(e) => {
                error!("Failed to auto-advance in guild {}: {}", self.guild_id, e);
                engine.announce(&messages::failure(&e)).await;
            }
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// Reset the queue and player and bind the client used to reach voice channels.
    pub async fn initialize(&self, client: Arc<dyn VoiceTransport>) {
        let mut state = self.state.lock().await;
        state.queue.clear();
        state.engine.reset().await;
        state.client = Some(client);
        info!("Initialized music session for guild {}", self.guild_id);
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.lock().await.client.is_some()
    }

    /// Resolve `query`, queue it for `requester` and make sure the queue is playing.
    /// Returns the title of the queued song.
    pub async fn add_song(
        &self,
        query: &str,
        requester: Requester,
        replies: Arc<dyn ReplySink>,
    ) -> MusicResult<String> {
        self.state.lock().await.client()?;

        let song = self.resolver.lookup(query).await.inspect_err(|e| {
            error!("Failed to resolve '{}' for guild {}: {}", query, self.guild_id, e)
        })?;
        let request = SongRequest::new(song, requester);
        let title = request.title().to_string();

        let mut state = self.state.lock().await;
        let client = state.client()?;
        let SessionState { queue, engine, .. } = &mut *state;

        let length = queue.push(request);
        info!(
            "Queued '{}' at position {} in guild {}",
            title, length, self.guild_id
        );

        let outcome = engine.attempt_play(client.as_ref(), queue, replies).await?;
        debug!("Play attempt in guild {}: {:?}", self.guild_id, outcome);
        Ok(title)
    }

    /// Start the current queue entry, replacing whatever is playing.
    pub async fn play(&self, replies: Arc<dyn ReplySink>) -> MusicResult<PlayOutcome> {
        let mut state = self.state.lock().await;
        let client = state.client()?;
        let SessionState { queue, engine, .. } = &mut *state;

        engine.announce_to(replies);
        engine.play_current(client.as_ref(), queue).await
    }

    /// Start, resume or leave the player alone depending on its state.
    pub async fn attempt_play(&self, replies: Arc<dyn ReplySink>) -> MusicResult<PlayOutcome> {
        let mut state = self.state.lock().await;
        let client = state.client()?;
        let SessionState { queue, engine, .. } = &mut *state;

        engine.attempt_play(client.as_ref(), queue, replies).await
    }

    /// Stop the current song; the next queued one starts on its own.
    /// Returns `false` when nothing was playing.
    pub async fn skip(&self) -> MusicResult<bool> {
        let state = self.state.lock().await;
        state.client()?;
        state.engine.skip().await
    }

    pub async fn pause(&self) -> MusicResult<bool> {
        let state = self.state.lock().await;
        state.client()?;
        state.engine.pause().await
    }

    pub async fn resume(&self) -> MusicResult<bool> {
        let state = self.state.lock().await;
        state.client()?;
        state.engine.resume().await
    }

    /// Set the volume in percent for the current and every later song.
    pub async fn set_volume(&self, percent: u8) -> MusicResult<()> {
        if percent > 100 {
            return Err(MusicError::InvalidVolume(percent));
        }

        let mut state = self.state.lock().await;
        state.client()?;
        state.engine.set_volume(f32::from(percent) / 100.0).await?;
        info!("Volume set to {}% in guild {}", percent, self.guild_id);
        Ok(())
    }

    pub async fn queue_snapshot(&self) -> QueueSnapshot {
        let state = self.state.lock().await;
        QueueSnapshot {
            current: state.queue.current().cloned(),
            upcoming: state.queue.upcoming().to_vec(),
            played: state.queue.played().len(),
            volume: (state.engine.volume() * 100.0).round().clamp(0.0, 100.0) as u8,
        }
    }

    /// Stop playback, forget the queue and leave the voice channel.
    pub async fn leave(&self) -> MusicResult<()> {
        let mut state = self.state.lock().await;
        state.client()?;
        state.engine.reset().await;
        state.queue.clear();
        drop(state);

        self.voices.leave(self.guild_id).await
    }
}

/// Every guild's music session, created on first use.
pub struct MusicSessions {
    sessions: DashMap<GuildId, Arc<MusicSession>>,
    services: MusicServices,
    client: Arc<dyn VoiceTransport>,
}

impl MusicSessions {
    pub fn new(services: MusicServices, client: Arc<dyn VoiceTransport>) -> Self {
        Self {
            sessions: Default::default(),
            services,
            client,
        }
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<MusicSession>> {
        self.sessions.get(&guild_id).map(|entry| entry.value().clone())
    }

    /// The guild's session, created and initialized on first use.
    pub async fn session(&self, guild_id: GuildId) -> Arc<MusicSession> {
        if let Some(session) = self.get(guild_id) {
            return session;
        }

        let fresh = MusicSession::new(guild_id, &self.services);
        fresh.initialize(self.client.clone()).await;
        // Another command may have created one meanwhile; the first insert wins.
        self.sessions
            .entry(guild_id)
            .or_insert(fresh)
            .value()
            .clone()
    }

    pub fn voices(&self) -> &Arc<VoiceManager> {
        &self.services.voices
    }
}
