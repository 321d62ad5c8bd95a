//! Jukebox: a Discord bot that plays music in voice channels.
//!
//! The library holds the commands, the per-guild music sessions and the gateway glue;
//! `main.rs` only wires them into a poise framework and starts the client.

pub mod commands;
pub mod config;
pub mod events;

use std::sync::Arc;

use commands::music::utils::music_manager::{MusicServices, MusicSessions};
use commands::music::utils::voice::VoiceTransport;
use commands::music::utils::voice_manager::VoiceManager;
use crate::config::Config;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

/// User data, stored and accessible in all command invocations and event handlers
pub struct Data {
    pub config: Config,
    pub music: Arc<MusicSessions>,
}

impl Data {
    /// Build the shared state once the voice client is available.
    pub fn new(
        config: Config,
        voices: Arc<VoiceManager>,
        client: Arc<dyn VoiceTransport>,
    ) -> Self {
        let services = MusicServices::from_config(&config, voices);
        Self {
            music: Arc::new(MusicSessions::new(services, client)),
            config,
        }
    }
}
