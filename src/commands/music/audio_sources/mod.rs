//! Turning a `/play` query into a direct media URL.
//!
//! Resolution is delegated to `yt-dlp` ([`youtube::YtDlpResolver`]); the
//! [`MediaResolver`] trait lets the playback pipeline run against any resolver.

/// Submodule defining the `TrackMetadata` struct used across audio sources.
pub mod track_metadata;
/// Submodule implementing `MediaResolver` on top of the `yt-dlp` binary.
pub mod youtube;

use crate::commands::music::utils::music_manager::MusicError;
use serenity::async_trait;
use url::Url;

pub use track_metadata::TrackMetadata;

/// A specialized `Result` type for operations within the `audio_sources` module.
pub type AudioSourceResult<T> = Result<T, MusicError>;

/// Anything able to resolve a URL or a search term to a streamable source.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> AudioSourceResult<TrackMetadata>;
}

/// A utility struct providing general helper functions related to audio sources.
pub struct AudioSource;

impl AudioSource {
    /// Whether the input is an http(s) URL rather than a search term.
    pub fn is_url(input: &str) -> bool {
        Url::parse(input.trim())
            .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
            .unwrap_or(false)
    }
}
