//! Test fixtures for the Jukebox Discord bot
//! This module contains sample data used in tests

use jukebox::commands::music::audio_sources::{Requester, SongDescriptor, SongRequest};
use poise::serenity_prelude::{ChannelId, GuildId, UserId};
use std::time::Duration;

pub const SAMPLE_GUILD_ID: u64 = 555555555;
pub const SAMPLE_USER_ID: u64 = 123456789;
pub const OTHER_USER_ID: u64 = 223456789;
pub const SAMPLE_VOICE_CHANNEL_ID: u64 = 987654321;
pub const OTHER_VOICE_CHANNEL_ID: u64 = 887654321;

pub fn guild_id() -> GuildId {
    GuildId::new(SAMPLE_GUILD_ID)
}

pub fn user_id() -> UserId {
    UserId::new(SAMPLE_USER_ID)
}

pub fn voice_channel() -> ChannelId {
    ChannelId::new(SAMPLE_VOICE_CHANNEL_ID)
}

/// A search result whose title is exactly `title`
pub fn song(title: &str) -> SongDescriptor {
    let id = title.replace(' ', "-");
    SongDescriptor {
        url: format!("https://www.youtube.com/watch?v={}", id),
        id,
        title: title.to_string(),
        description: None,
        duration: Some(Duration::from_secs(200)),
        thumbnail: None,
        views: Some(1000),
    }
}

pub fn requester() -> Requester {
    Requester {
        id: user_id(),
        name: "alice".to_string(),
    }
}

pub fn other_requester() -> Requester {
    Requester {
        id: UserId::new(OTHER_USER_ID),
        name: "bob".to_string(),
    }
}

pub fn request(title: &str) -> SongRequest {
    SongRequest::new(song(title), requester())
}
