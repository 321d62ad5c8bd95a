//! The bot's side of a guild voice connection: the status state machine, the ports a
//! voice backend implements, and [`VoiceSession`], one live connection per guild.

use poise::serenity_prelude::{ChannelId, GuildId, UserId};
use serenity::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use super::music_manager::{MusicError, MusicResult};
use super::playback::{AudioPlayer, AudioResource, IdleNotifier};

/// Lifecycle of a voice connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    /// Asking the gateway for a voice session.
    Signalling,
    /// Voice server assigned, handshaking with it.
    Connecting,
    Ready,
    Disconnected,
    /// Terminal: resources released, the session is gone from the registry.
    Destroyed,
}

impl ConnectionStatus {
    /// Whether a connection in this status can still carry audio without re-joining.
    pub fn is_gone(self) -> bool {
        match self {
            ConnectionStatus::Disconnected | ConnectionStatus::Destroyed => true,
            ConnectionStatus::Signalling | ConnectionStatus::Connecting | ConnectionStatus::Ready => {
                false
            }
        }
    }

    pub fn can_transition_to(self, next: ConnectionStatus) -> bool {
        match self {
            ConnectionStatus::Destroyed => false,
            current => current != next,
        }
    }
}

/// Shared, observable status of one connection.
///
/// Every accepted transition is broadcast, so observers see intermediate states even when
/// several transitions happen before they are polled.
#[derive(Clone)]
pub struct StatusTracker {
    current: Arc<watch::Sender<ConnectionStatus>>,
    transitions: broadcast::Sender<ConnectionStatus>,
}

impl StatusTracker {
    pub fn new(initial: ConnectionStatus) -> Self {
        let (transitions, _) = broadcast::channel(16);
        Self {
            current: Arc::new(watch::Sender::new(initial)),
            transitions,
        }
    }

    pub fn get(&self) -> ConnectionStatus {
        *self.current.borrow()
    }

    /// Apply a transition. Returns `false` when it is rejected (same status, or already destroyed).
    pub fn set(&self, next: ConnectionStatus) -> bool {
        let changed = self.current.send_if_modified(|status| {
            if status.can_transition_to(next) {
                *status = next;
                true
            } else {
                false
            }
        });

        if changed {
            debug!("Voice connection entered {:?}", next);
            // No receivers just means nobody is observing yet.
            let _ = self.transitions.send(next);
        }
        changed
    }

    /// Receive every transition accepted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionStatus> {
        self.transitions.subscribe()
    }
}

/// The platform side of voice: who is where, and how to join.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// The voice channel the member is currently in, if any.
    fn member_voice_channel(&self, guild_id: GuildId, user_id: UserId) -> Option<ChannelId>;

    /// Open a connection to `channel_id`. The transport reports status changes of the new
    /// connection through `status`.
    async fn join(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        status: StatusTracker,
    ) -> MusicResult<Arc<dyn VoiceConnection>>;
}

/// A joined voice channel that players can be subscribed to.
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    /// Start a new player for `resource` on this connection. `on_idle` must be signalled
    /// whenever that player goes idle (stream ended, stopped or errored).
    async fn subscribe(
        &self,
        resource: AudioResource,
        on_idle: IdleNotifier,
    ) -> MusicResult<Box<dyn AudioPlayer>>;

    /// Leave the channel and release everything held for it.
    async fn destroy(&self) -> MusicResult<()>;
}

/// The live voice connection for one guild.
pub struct VoiceSession {
    guild_id: GuildId,
    channel_id: ChannelId,
    connection: Arc<dyn VoiceConnection>,
    status: StatusTracker,
    destroyed: AtomicBool,
}

impl std::fmt::Debug for VoiceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceSession")
            .field("guild_id", &self.guild_id)
            .field("channel_id", &self.channel_id)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl VoiceSession {
    pub fn new(
        guild_id: GuildId,
        channel_id: ChannelId,
        connection: Arc<dyn VoiceConnection>,
        status: StatusTracker,
    ) -> Self {
        Self {
            guild_id,
            channel_id,
            connection,
            status,
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.get()
    }

    pub fn tracker(&self) -> &StatusTracker {
        &self.status
    }

    pub async fn subscribe(
        &self,
        resource: AudioResource,
        on_idle: IdleNotifier,
    ) -> MusicResult<Box<dyn AudioPlayer>> {
        let status = self.status();
        if status.is_gone() {
            return Err(MusicError::ConnectionFailure(format!(
                "voice connection for guild {} is {:?}",
                self.guild_id, status
            )));
        }
        self.connection.subscribe(resource, on_idle).await
    }

    /// Tear the connection down. Only the first call does anything; returns whether it was this one.
    pub(crate) async fn destroy(&self) -> bool {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return false;
        }

        if let Err(e) = self.connection.destroy().await {
            warn!(
                "Failed to release voice connection for guild {}: {}",
                self.guild_id, e
            );
        }
        self.status.set(ConnectionStatus::Destroyed);
        true
    }

    /// Stop tracking this session without releasing the underlying connection.
    pub(crate) fn retire(&self) {
        self.destroyed.store(true, Ordering::Release);
        self.status.set(ConnectionStatus::Destroyed);
    }
}
