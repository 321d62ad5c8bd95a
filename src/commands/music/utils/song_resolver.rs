use std::sync::Arc;
use tracing::{debug, info};

use super::music_manager::{MusicError, MusicResult};
use crate::commands::music::audio_sources::{SongDescriptor, SongSearcher};

/// Turns a free-text query into the song to play.
///
/// The first search result is taken as the best match; nothing is ranked or cached,
/// so repeating a query asks the provider again.
#[derive(Clone)]
pub struct SongResolver {
    searcher: Arc<dyn SongSearcher>,
}

impl SongResolver {
    pub fn new(searcher: Arc<dyn SongSearcher>) -> Self {
        Self { searcher }
    }

    pub async fn lookup(&self, query: &str) -> MusicResult<SongDescriptor> {
        let query = query.trim();
        if query.is_empty() {
            return Err(MusicError::NotFound(query.to_string()));
        }

        let results = self.searcher.search(query).await?;
        debug!("Search for '{}' yielded {} result(s)", query, results.len());

        let song = results
            .into_iter()
            .next()
            .ok_or_else(|| MusicError::NotFound(query.to_string()))?;

        info!("Resolved '{}' to '{}' ({})", query, song.title, song.url);
        Ok(song)
    }
}
