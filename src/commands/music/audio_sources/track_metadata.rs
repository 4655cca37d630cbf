//! Defines the `TrackMetadata` struct, the resolved form of a `/play` query,
//! and the conversion from `yt-dlp` JSON output.

use crate::commands::music::utils::music_manager::MusicError;
use serde::Deserialize;
use std::process::Output;
use std::time::Duration;

use super::AudioSourceResult;

/// A query resolved to something ffmpeg can stream.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMetadata {
    /// The title of the track.
    pub title: String,
    /// The page the track was found on (e.g. the YouTube watch URL), if known.
    pub url: Option<String>,
    /// Direct media URL handed to ffmpeg.
    pub stream_url: String,
    /// The duration of the track, if available.
    pub duration: Option<Duration>,
    /// URL to a thumbnail image for the track, if available.
    pub thumbnail: Option<String>,
}

impl TrackMetadata {
    pub fn for_stream(title: impl Into<String>, stream_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: None,
            stream_url: stream_url.into(),
            duration: None,
            thumbnail: None,
        }
    }

    /// Parse the output of `yt-dlp -j`.
    ///
    /// Only the first JSON document is considered. When it describes a
    /// playlist, the first non-empty entry is used.
    pub fn from_yt_dlp_json(raw: &str) -> AudioSourceResult<Self> {
        let line = raw
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| {
                MusicError::AudioSourceError("No media could be extracted from that link.".into())
            })?;

        let info: YtDlpInfo = serde_json::from_str(line).map_err(|e| {
            MusicError::AudioSourceError(format!("Failed to parse video metadata: {}", e))
        })?;

        let info = match info.entries {
            Some(entries) => entries.into_iter().flatten().next().ok_or_else(|| {
                MusicError::AudioSourceError(
                    "No playable entries were found in that playlist.".into(),
                )
            })?,
            None => info,
        };

        let stream_url = info.url.filter(|url| !url.is_empty()).ok_or_else(|| {
            MusicError::AudioSourceError(
                "No playable audio stream was found for that link.".into(),
            )
        })?;

        Ok(TrackMetadata {
            title: info
                .title
                .filter(|title| !title.trim().is_empty())
                .unwrap_or_else(|| "audio stream".to_string()),
            url: info.webpage_url,
            stream_url,
            duration: info
                .duration
                .filter(|secs| secs.is_finite() && *secs > 0.0)
                .map(Duration::from_secs_f64),
            thumbnail: info.thumbnail,
        })
    }
}

/// The subset of `yt-dlp`'s info dict we care about.
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    url: Option<String>,
    title: Option<String>,
    webpage_url: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    entries: Option<Vec<Option<YtDlpInfo>>>,
}

/// Converts the output of `yt-dlp -j` into `TrackMetadata`.
impl TryFrom<Output> for TrackMetadata {
    type Error = MusicError;

    fn try_from(value: Output) -> Result<Self, Self::Error> {
        if !value.status.success() {
            let stderr = String::from_utf8_lossy(&value.stderr);
            let reason = stderr
                .lines()
                .map(str::trim)
                .find(|line| line.starts_with("ERROR:"))
                .or_else(|| stderr.lines().map(str::trim).find(|line| !line.is_empty()))
                .unwrap_or("yt-dlp exited without output");
            return Err(MusicError::AudioSourceError(format!(
                "Couldn't get that audio: {}",
                reason
            )));
        }

        Self::from_yt_dlp_json(&String::from_utf8_lossy(&value.stdout))
    }
}
