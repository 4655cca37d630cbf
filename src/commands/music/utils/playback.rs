//! Starting, pausing and stopping the single stream a guild may play.

use serenity::model::id::{ChannelId, GuildId};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::commands::music::audio_sources::{MediaResolver, TrackMetadata};

use super::music_manager::{
    ActiveStream, GuildSlot, MusicError, MusicResult, VoiceSessions,
};
use super::voice_driver::StreamEnd;

/// Flags placed before `-i`: reconnect on dropped HTTP streams, no stdin, audio only.
pub const FFMPEG_BEFORE_OPTIONS: &str =
    "-reconnect 1 -reconnect_streamed 1 -reconnect_delay_max 5 -nostdin -vn -reorder_queue_size 0";
/// Flags placed after the input.
pub const FFMPEG_OPTIONS: &str = "-vn -bufsize 64k -loglevel warning";
/// Output encoding handed to songbird: Ogg/Opus on stdout.
pub const FFMPEG_OUTPUT: &str = "-c:a libopus -b:a 128k -ar 48000 -ac 2 -f ogg pipe:1";

/// The ffmpeg invocation shared by every playback in the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    pub program: String,
    pub before_options: Vec<String>,
    pub options: Vec<String>,
    pub output: Vec<String>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl TransportOptions {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            before_options: split_flags(FFMPEG_BEFORE_OPTIONS),
            options: split_flags(FFMPEG_OPTIONS),
            output: split_flags(FFMPEG_OUTPUT),
        }
    }

    /// Full argument list for transcoding `source_url`.
    pub fn args(&self, source_url: &str) -> Vec<String> {
        let mut args = self.before_options.clone();
        args.push("-i".to_string());
        args.push(source_url.to_string());
        args.extend(self.options.iter().cloned());
        args.extend(self.output.iter().cloned());
        args
    }
}

fn split_flags(flags: &str) -> Vec<String> {
    flags.split_whitespace().map(str::to_string).collect()
}

/// One `/play` worth of work for the voice driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackRequest {
    pub source_url: String,
    pub title: String,
    pub options: TransportOptions,
}

impl PlaybackRequest {
    pub fn new(metadata: &TrackMetadata, options: TransportOptions) -> Self {
        Self {
            source_url: metadata.stream_url.clone(),
            title: metadata.title.clone(),
            options,
        }
    }

    /// The ffmpeg process writing the encoded stream to stdout, with its
    /// diagnostics piped so they can be relayed to the log.
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.options.program);
        command
            .args(self.options.args(&self.source_url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

/// Result of a successful `/play`
#[derive(Debug, Clone, PartialEq)]
pub struct PlayOutcome {
    pub metadata: TrackMetadata,
    /// Whether a stream that was already playing got stopped to make room.
    pub replaced: bool,
}

/// Resolves queries and drives playback on the connections held by [`VoiceSessions`].
pub struct PlaybackInvoker {
    sessions: Arc<VoiceSessions>,
    resolver: Arc<dyn MediaResolver>,
    options: TransportOptions,
    auto_join: bool,
    next_stream_id: AtomicU64,
}

impl PlaybackInvoker {
    pub fn new(
        sessions: Arc<VoiceSessions>,
        resolver: Arc<dyn MediaResolver>,
        options: TransportOptions,
    ) -> Self {
        Self {
            sessions,
            resolver,
            options,
            auto_join: true,
            next_stream_id: AtomicU64::new(1),
        }
    }

    /// Whether `play` may connect on its own when the bot is not in a channel yet.
    pub fn with_auto_join(mut self, auto_join: bool) -> Self {
        self.auto_join = auto_join;
        self
    }

    fn connected_slot(&self, guild_id: GuildId) -> MusicResult<GuildSlot> {
        self.sessions
            .existing_slot(guild_id)
            .ok_or(MusicError::NotConnected)
    }

    /// Resolve `query` and play it in the caller's channel, replacing any current stream.
    pub async fn play(
        &self,
        guild_id: GuildId,
        user_channel: Option<ChannelId>,
        query: &str,
    ) -> MusicResult<PlayOutcome> {
        let channel_id = user_channel.ok_or(MusicError::UserNotInVoiceChannel)?;

        let slot = self.sessions.slot(guild_id);
        let mut state = slot.lock().await;

        if state.is_none() && !self.auto_join {
            return Err(MusicError::NotConnected);
        }

        let metadata = self.resolver.resolve(query).await?;
        info!("Resolved '{}' to '{}'", query, metadata.title);

        self.sessions
            .connect_locked(&mut state, guild_id, channel_id)
            .await?;
        let current = state.as_mut().ok_or(MusicError::NotConnected)?;

        let replaced = match current.stream.take() {
            Some(previous) => {
                info!(
                    "Stopping '{}' in guild {} for a new request",
                    previous.metadata.title, guild_id
                );
                previous.halt(guild_id);
                true
            }
            None => false,
        };

        let request = PlaybackRequest::new(&metadata, self.options.clone());
        let started = self
            .sessions
            .driver()
            .start_stream(guild_id, request)
            .await?;

        let id = self.next_stream_id.fetch_add(1, Ordering::Relaxed);
        current.stream = Some(ActiveStream {
            id,
            metadata: metadata.clone(),
            paused: false,
            control: started.control,
        });
        drop(state);

        Self::watch_stream(guild_id, Arc::clone(&slot), id, started.finished);

        Ok(PlayOutcome { metadata, replaced })
    }

    /// Wait for the stream's end signal and mark the guild idle if it is still current.
    fn watch_stream(
        guild_id: GuildId,
        slot: GuildSlot,
        id: u64,
        finished: oneshot::Receiver<StreamEnd>,
    ) {
        tokio::spawn(async move {
            // A dropped sender means the track was torn down with its connection.
            let end = finished.await.unwrap_or(StreamEnd::Finished);
            if let StreamEnd::Failed(reason) = &end {
                error!("Stream {} in guild {} failed: {}", id, guild_id, reason);
            }

            let mut state = slot.lock().await;
            if let Some(current) = state.as_mut() {
                if current.stream.as_ref().is_some_and(|stream| stream.id == id) {
                    current.stream = None;
                    info!("Guild {} is idle after stream {} ended", guild_id, id);
                }
            }
        });
    }

    pub async fn pause(&self, guild_id: GuildId) -> MusicResult<TrackMetadata> {
        let slot = self.connected_slot(guild_id)?;
        let mut state = slot.lock().await;

        let current = state.as_mut().ok_or(MusicError::NotConnected)?;
        let stream = current
            .stream
            .as_mut()
            .filter(|stream| !stream.paused)
            .ok_or(MusicError::NothingPlaying)?;

        stream.control.pause()?;
        stream.paused = true;
        Ok(stream.metadata.clone())
    }

    pub async fn resume(&self, guild_id: GuildId) -> MusicResult<TrackMetadata> {
        let slot = self.connected_slot(guild_id)?;
        let mut state = slot.lock().await;

        let current = state.as_mut().ok_or(MusicError::NotConnected)?;
        let stream = current.stream.as_mut().ok_or(MusicError::NothingPlaying)?;
        if !stream.paused {
            return Err(MusicError::NotPaused);
        }

        stream.control.resume()?;
        stream.paused = false;
        Ok(stream.metadata.clone())
    }

    /// Stop the current stream; returns what was stopped, or `None` when idle.
    ///
    /// If the transport refuses to stop, the stream stays current and the error is returned.
    pub async fn stop(&self, guild_id: GuildId) -> MusicResult<Option<TrackMetadata>> {
        let slot = self.connected_slot(guild_id)?;
        let mut state = slot.lock().await;

        let current = state.as_mut().ok_or(MusicError::NotConnected)?;
        let Some(stream) = current.stream.as_ref() else {
            return Ok(None);
        };

        if let Err(e) = stream.control.stop() {
            warn!("Failed to stop stream in guild {}: {}", guild_id, e);
            return Err(e);
        }
        let metadata = stream.metadata.clone();
        current.stream = None;
        info!("Stopped '{}' in guild {}", metadata.title, guild_id);
        Ok(Some(metadata))
    }

    /// Title of the active stream and whether it is paused.
    pub async fn now_playing(&self, guild_id: GuildId) -> Option<(TrackMetadata, bool)> {
        let slot = self.sessions.existing_slot(guild_id)?;
        let state = slot.lock().await;

        state
            .as_ref()
            .and_then(|current| current.stream.as_ref())
            .map(|stream| (stream.metadata.clone(), stream.paused))
    }
}
