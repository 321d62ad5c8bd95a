use poise::serenity_prelude::{ChannelId, Http};
use serenity::async_trait;
use std::fmt::Write;
use std::sync::Arc;
use tracing::warn;

use super::format_duration;
use super::music_manager::{MusicError, QueueSnapshot};
use crate::commands::music::audio_sources::SongRequest;

/// Upcoming entries listed by the `queue` command before the rest is summarized.
const QUEUE_PREVIEW: usize = 10;

/// Where the music core posts notices. Sending never fails from the caller's point of view.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, text: &str);
}

/// Posts notices to a guild text channel.
pub struct ChannelReplies {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl ChannelReplies {
    pub fn new(http: Arc<Http>, channel_id: ChannelId) -> Self {
        Self { http, channel_id }
    }
}

#[async_trait]
impl ReplySink for ChannelReplies {
    async fn send(&self, text: &str) {
        if let Err(e) = self.channel_id.say(&self.http, text).await {
            warn!("Failed to send message to channel {}: {}", self.channel_id, e);
        }
    }
}

pub fn now_playing(title: &str) -> String {
    format!("Now playing: {}", title)
}

pub fn queued(title: &str) -> String {
    format!("Added **{}** to the queue", title)
}

/// User-facing text for a failed music command.
pub fn failure(error: &MusicError) -> String {
    match error {
        MusicError::NotFound(query) => format!("❌ No results found for `{}`", query),
        MusicError::NoVoiceChannel => "❌ You need to be in a voice channel".to_string(),
        MusicError::NotInGuild => "❌ This command only works in a server".to_string(),
        MusicError::NotConnected => "❌ I'm not in a voice channel".to_string(),
        MusicError::InvalidVolume(_) => "❌ Volume must be between 0 and 100".to_string(),
        MusicError::NotInitialized
        | MusicError::ConnectionFailure(_)
        | MusicError::StreamFailure(_)
        | MusicError::SearchFailure(_)
        | MusicError::PlayerControl(_)
        | MusicError::NoVoiceManager => {
            "❌ Something went wrong, please try again".to_string()
        }
    }
}

fn entry_line(request: &SongRequest) -> String {
    let duration = request
        .song
        .duration
        .map(format_duration)
        .unwrap_or_else(|| "?:??".to_string());

    format!(
        "**{}** `{}` requested by {}",
        request.title(),
        duration,
        request.requested_by.name
    )
}

/// The `queue` command's listing.
pub fn queue_listing(snapshot: &QueueSnapshot) -> String {
    let Some(current) = &snapshot.current else {
        return "The queue is empty".to_string();
    };

    let mut text = format!("🎵 Now playing: {}\n", entry_line(current));
    if !snapshot.upcoming.is_empty() {
        text.push_str("\n**Up next**\n");
    }
    for (position, request) in snapshot.upcoming.iter().take(QUEUE_PREVIEW).enumerate() {
        let _ = writeln!(text, "{}. {}", position + 1, entry_line(request));
    }
    if snapshot.upcoming.len() > QUEUE_PREVIEW {
        let _ = writeln!(
            text,
            "...and {} more",
            snapshot.upcoming.len() - QUEUE_PREVIEW
        );
    }

    let _ = write!(
        text,
        "\n{} played so far · volume {}%",
        snapshot.played, snapshot.volume
    );
    text
}
