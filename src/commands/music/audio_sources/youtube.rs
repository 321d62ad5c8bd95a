//! Implements the search and streaming providers for YouTube.
//! Uses the `yt-dlp` command-line tool for searching and songbird's `YoutubeDl` input
//! for streaming.

use serde::Deserialize;
use serenity::async_trait;
use songbird::input::{Compose, YoutubeDl};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use super::{AudioStream, AudioStreamer, SongDescriptor, SongSearcher, is_url};
use crate::commands::music::utils::music_manager::{MusicError, MusicResult};

/// Searches YouTube by shelling out to `yt-dlp`.
pub struct YtDlpSearcher {
    /// Number of candidates requested per search.
    limit: usize,
}

impl YtDlpSearcher {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    fn args(&self, query: &str) -> Vec<String> {
        if is_url(query) {
            // A link is resolved as-is instead of being searched for.
            vec!["-j".into(), "--no-playlist".into(), query.into()]
        } else {
            vec![
                "-j".into(),
                "--flat-playlist".into(),
                format!("ytsearch{}:{}", self.limit, query),
            ]
        }
    }
}

#[async_trait]
impl SongSearcher for YtDlpSearcher {
    async fn search(&self, query: &str) -> MusicResult<Vec<SongDescriptor>> {
        info!("Searching YouTube for: {}", query);

        let output = Command::new("yt-dlp")
            .args(self.args(query))
            .output()
            .await
            .map_err(|e| MusicError::SearchFailure(format!("Failed to run yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MusicError::SearchFailure(format!(
                "yt-dlp exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let songs = parse_search_output(&output.stdout)?;
        debug!("yt-dlp returned {} result(s) for '{}'", songs.len(), query);
        Ok(songs)
    }
}

/// One line of `yt-dlp -j` output. Flat search entries and full extractions
/// carry different subsets of these fields.
#[derive(Debug, Deserialize)]
struct YtDlpEntry {
    id: String,
    title: Option<String>,
    webpage_url: Option<String>,
    url: Option<String>,
    description: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    #[serde(default)]
    thumbnails: Vec<YtDlpThumbnail>,
    view_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct YtDlpThumbnail {
    url: String,
}

impl From<YtDlpEntry> for SongDescriptor {
    fn from(entry: YtDlpEntry) -> Self {
        // Full extractions put the media URL in `url`; the page URL is `webpage_url`.
        let url = entry
            .webpage_url
            .or(entry.url)
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", entry.id));

        // The last listed thumbnail is the largest one.
        let thumbnail = entry
            .thumbnail
            .or_else(|| entry.thumbnails.into_iter().last().map(|t| t.url));

        SongDescriptor {
            url,
            title: entry.title.unwrap_or_else(|| "Unknown Title".to_string()),
            description: entry.description,
            duration: entry
                .duration
                .filter(|secs| secs.is_finite() && *secs >= 0.0)
                .map(Duration::from_secs_f64),
            thumbnail,
            views: entry.view_count,
            id: entry.id,
        }
    }
}

/// Converts `yt-dlp -j` output (one JSON object per line) into descriptors, preserving order.
fn parse_search_output(stdout: &[u8]) -> MusicResult<Vec<SongDescriptor>> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str::<YtDlpEntry>(line)
                .map(SongDescriptor::from)
                .map_err(|e| {
                    MusicError::SearchFailure(format!("Failed to parse video metadata: {}", e))
                })
        })
        .collect()
}

/// Streams audio through songbird's `YoutubeDl` input.
pub struct YtDlpStreamer {
    http: reqwest::Client,
}

impl YtDlpStreamer {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Default for YtDlpStreamer {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl AudioStreamer for YtDlpStreamer {
    async fn stream(&self, url: &str) -> MusicResult<AudioStream> {
        info!("Opening audio stream for URL: {}", url);
        let mut source = YoutubeDl::new(self.http.clone(), url.to_string());

        // Resolve the source up front so an unplayable URL fails here, not mid-mixer.
        source
            .aux_metadata()
            .await
            .map_err(|e| MusicError::StreamFailure(format!("{}: {}", url, e)))?;

        Ok(AudioStream::new(url, source))
    }
}
