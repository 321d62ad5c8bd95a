//! This module defines the seams through which the music core reaches the outside world
//! for songs: a search provider that turns a query into candidate songs, and a streaming
//! provider that turns a song URL into playable audio. The yt-dlp backed implementations
//! live in [`youtube`].

/// Submodule defining `SongDescriptor`, `SongRequest` and `Requester`.
pub mod song;
/// Submodule implementing both providers on top of `yt-dlp`.
pub mod youtube;

use crate::commands::music::utils::music_manager::MusicResult;
use serenity::async_trait;
use songbird::input::Input;
use url::Url;

pub use song::{Requester, SongDescriptor, SongRequest};

/// A searchable catalogue of songs.
///
/// Results are unranked and consumed positionally: the first element is taken as the
/// best match by the resolver.
#[async_trait]
pub trait SongSearcher: Send + Sync {
    async fn search(&self, query: &str) -> MusicResult<Vec<SongDescriptor>>;
}

/// Opens audio for a song URL.
#[async_trait]
pub trait AudioStreamer: Send + Sync {
    async fn stream(&self, url: &str) -> MusicResult<AudioStream>;
}

/// An opened audio stream, ready to be wrapped into a playable resource.
pub struct AudioStream {
    /// The URL the stream was opened for.
    pub url: String,
    pub input: Input,
}

impl AudioStream {
    pub fn new(url: impl Into<String>, input: impl Into<Input>) -> Self {
        Self {
            url: url.into(),
            input: input.into(),
        }
    }
}

/// Performs a basic check if the input string is an http(s) URL.
/// Does not validate if the URL is actually reachable or supported by any provider.
pub fn is_url(input: &str) -> bool {
    Url::parse(input).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}
