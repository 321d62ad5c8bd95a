//! Defines `SongDescriptor`, the immutable result of a search, and `SongRequest`,
//! a descriptor attributed to the user who asked for it.

use poise::serenity_prelude::{User, UserId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Metadata and streamable URL of a song, as returned by a search provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SongDescriptor {
    /// Provider-specific identifier (e.g. the YouTube video id).
    pub id: String,
    /// Canonical page URL, also what the audio streamer is handed.
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(with = "humantime_serde")]
    pub duration: Option<Duration>,
    pub thumbnail: Option<String>,
    pub views: Option<u64>,
}

/// Identity of the user who asked for a song, kept for attribution in replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub id: UserId,
    pub name: String,
}

impl From<&User> for Requester {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
        }
    }
}

/// A queue entry: the song plus who requested it.
#[derive(Debug, Clone, PartialEq)]
pub struct SongRequest {
    pub song: SongDescriptor,
    pub requested_by: Requester,
}

impl SongRequest {
    pub fn new(song: SongDescriptor, requested_by: Requester) -> Self {
        Self { song, requested_by }
    }

    pub fn title(&self) -> &str {
        &self.song.title
    }
}
