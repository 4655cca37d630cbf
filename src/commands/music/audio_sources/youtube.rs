//! Implements the `MediaResolver` trait with the `yt-dlp` command-line tool.
//! URLs are passed through as-is; anything else becomes a YouTube search.

use crate::commands::music::utils::music_manager::MusicError;
use serenity::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::{AudioSource, AudioSourceResult, MediaResolver, TrackMetadata};

/// Resolves queries by shelling out to `yt-dlp`.
pub struct YtDlpResolver {
    program: String,
}

impl YtDlpResolver {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// What `yt-dlp` is asked to look up: URLs verbatim, everything else as a search.
    pub fn search_param(query: &str) -> String {
        let query = query.trim();
        if AudioSource::is_url(query) {
            query.to_string()
        } else {
            format!("ytsearch1:{}", query)
        }
    }

    /// Arguments for a metadata-only extraction of the best audio format.
    pub fn args(query: &str) -> Vec<String> {
        let mut args: Vec<String> = [
            "-j",            // Output as JSON
            "--no-playlist", // Don't process playlists
            "-f",
            "bestaudio/best",
            "--default-search",
            "auto",
            "--no-check-certificates",
            "--geo-bypass",
            "--source-address",
            "0.0.0.0",
            "--retries",
            "3",
            "--quiet",
            "--no-warnings",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        args.push(Self::search_param(query));
        args
    }
}

#[async_trait]
impl MediaResolver for YtDlpResolver {
    async fn resolve(&self, query: &str) -> AudioSourceResult<TrackMetadata> {
        if query.trim().is_empty() {
            return Err(MusicError::AudioSourceError(
                "Give me a link or something to search for.".into(),
            ));
        }

        info!("Resolving audio source for query: {}", query);
        let output = Command::new(&self.program)
            .args(Self::args(query))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                MusicError::AudioSourceError(format!("Failed to run {}: {}", self.program, e))
            })?;

        let metadata = TrackMetadata::try_from(output)?;
        debug!("Resolved metadata: {:?}", metadata);
        Ok(metadata)
    }
}
