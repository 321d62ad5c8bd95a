use dashmap::DashMap;
use poise::serenity_prelude::{GuildId, UserId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

use super::music_manager::{MusicError, MusicResult};
use super::voice::{ConnectionStatus, StatusTracker, VoiceSession, VoiceTransport};

/// How long a dropped connection gets to start re-signalling before it is torn down.
pub const DEFAULT_RECONNECT_GRACE: Duration = Duration::from_secs(5);

/// Registry of live voice sessions, one per guild.
pub struct VoiceManager {
    sessions: DashMap<GuildId, Arc<VoiceSession>>,
    reconnect_grace: Duration,
}

impl Default for VoiceManager {
    fn default() -> Self {
        Self::new(DEFAULT_RECONNECT_GRACE)
    }
}

impl VoiceManager {
    pub fn new(reconnect_grace: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            reconnect_grace,
        }
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<VoiceSession>> {
        self.sessions.get(&guild_id).map(|entry| entry.value().clone())
    }

    /// Feed a status change observed outside the voice driver (e.g. gateway voice updates).
    pub fn report(&self, guild_id: GuildId, status: ConnectionStatus) -> bool {
        match self.get(guild_id) {
            Some(session) => session.tracker().set(status),
            None => false,
        }
    }

    /// Return the guild's usable voice session, joining the member's channel when there is none.
    ///
    /// An existing session is returned as-is even if the member has since moved elsewhere.
    pub async fn ensure_connected(
        self: &Arc<Self>,
        client: &dyn VoiceTransport,
        guild_id: GuildId,
        member_id: UserId,
    ) -> MusicResult<Arc<VoiceSession>> {
        if let Some(session) = self.get(guild_id) {
            let status = session.status();
            if !status.is_gone() {
                debug!("Reusing voice connection for guild {}", guild_id);
                return Ok(session);
            }
            debug!(
                "Voice connection for guild {} is {:?}, joining again",
                guild_id, status
            );
        }

        let channel_id = client
            .member_voice_channel(guild_id, member_id)
            .ok_or_else(|| {
                error!(
                    "Member {} is not in a voice channel in guild {}",
                    member_id, guild_id
                );
                MusicError::NoVoiceChannel
            })?;

        info!("Joining voice channel {} in guild {}", channel_id, guild_id);
        let status = StatusTracker::new(ConnectionStatus::Signalling);
        let connection = client
            .join(guild_id, channel_id, status.clone())
            .await
            .inspect_err(|e| {
                error!(
                    "Failed to join voice channel {} for guild {}: {}",
                    channel_id, guild_id, e
                )
            })?;

        let session = Arc::new(VoiceSession::new(guild_id, channel_id, connection, status));
        if session.status().is_gone() {
            error!(
                "Voice connection for guild {} was {:?} right after joining",
                guild_id,
                session.status()
            );
            session.destroy().await;
            return Err(MusicError::ConnectionFailure(
                "Could not get voice connection".to_string(),
            ));
        }

        let transitions = session.tracker().subscribe();
        if let Some(previous) = self.sessions.insert(guild_id, session.clone()) {
            // The backend reuses one connection per guild, so the old handle only stops
            // being tracked.
            previous.retire();
        }
        tokio::spawn(Arc::clone(self).watch_disconnects(session.clone(), transitions));

        Ok(session)
    }

    /// Destroy the guild's voice session.
    pub async fn leave(&self, guild_id: GuildId) -> MusicResult<()> {
        let session = self.get(guild_id).ok_or(MusicError::NotConnected)?;
        info!("Leaving voice channel in guild {}", guild_id);
        self.destroy(&session).await;
        Ok(())
    }

    /// Destroy every session, used on shutdown.
    pub async fn destroy_all(&self) {
        let sessions: Vec<_> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        for session in sessions {
            self.destroy(&session).await;
        }
    }

    /// Remove `session` from the registry and release it. A session that was already
    /// superseded by a newer join is only retired.
    async fn destroy(&self, session: &Arc<VoiceSession>) -> bool {
        let guild_id = session.guild_id();
        let removed = self
            .sessions
            .remove_if(&guild_id, |_, current| Arc::ptr_eq(current, session))
            .is_some();

        if !removed {
            debug!("Voice session for guild {} was superseded", guild_id);
            session.retire();
            return false;
        }

        let destroyed = session.destroy().await;
        if destroyed {
            info!("Destroyed voice connection for guild {}", guild_id);
        }
        destroyed
    }

    /// Observe one session until it is destroyed, reconciling every disconnect.
    async fn watch_disconnects(
        self: Arc<Self>,
        session: Arc<VoiceSession>,
        mut transitions: broadcast::Receiver<ConnectionStatus>,
    ) {
        loop {
            let disconnected = match transitions.recv().await {
                Ok(ConnectionStatus::Disconnected) => true,
                Ok(ConnectionStatus::Destroyed) | Err(RecvError::Closed) => break,
                Ok(_) => false,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "Missed {} voice status update(s) for guild {}",
                        skipped,
                        session.guild_id()
                    );
                    session.status() == ConnectionStatus::Disconnected
                }
            };

            if disconnected && self.reconcile_disconnect(&session, &mut transitions).await {
                break;
            }
        }
        debug!(
            "Stopped watching voice connection for guild {}",
            session.guild_id()
        );
    }

    /// Decide whether a disconnect is transient. Returns `true` once the session is gone.
    ///
    /// Reads the watcher's own receiver, so transitions queued right behind the
    /// disconnect count towards recovery.
    async fn reconcile_disconnect(
        &self,
        session: &Arc<VoiceSession>,
        transitions: &mut broadcast::Receiver<ConnectionStatus>,
    ) -> bool {
        let guild_id = session.guild_id();
        let grace = self.reconnect_grace;

        let recovery = tokio::time::timeout(grace, async {
            loop {
                match transitions.recv().await {
                    Ok(
                        status @ (ConnectionStatus::Signalling
                        | ConnectionStatus::Connecting
                        | ConnectionStatus::Destroyed),
                    ) => return Some(status),
                    Ok(ConnectionStatus::Ready | ConnectionStatus::Disconnected) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(
                            "Missed {} voice status update(s) for guild {}",
                            skipped, guild_id
                        );
                        match session.status() {
                            ConnectionStatus::Disconnected => continue,
                            status => return Some(status),
                        }
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
        .await;

        match recovery {
            Ok(Some(ConnectionStatus::Destroyed) | None) => true,
            Ok(Some(status)) => {
                // Signalling again means it is moving to a new channel
                debug!(
                    "Voice connection for guild {} recovered through {:?}",
                    guild_id, status
                );
                false
            }
            Err(_) => {
                info!(
                    "Voice connection for guild {} did not recover within {:?}",
                    guild_id, grace
                );
                self.destroy(session).await;
                true
            }
        }
    }
}
