//! The seam between the session store and the actual voice transport.
//!
//! [`VoiceDriver`] is implemented by [`SongbirdDriver`] in production; tests
//! substitute an in-memory driver.

use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use serenity::prelude::Mutex as SerenityMutex;
use songbird::error::JoinError;
use songbird::input::{ChildContainer, Input};
use songbird::tracks::TrackHandle;
use songbird::{Call, Event, Songbird, TrackEvent};
use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::event_handlers::TrackEndNotifier;
use super::music_manager::{MusicError, MusicResult};
use super::playback::PlaybackRequest;

/// How a stream finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    Finished,
    Failed(String),
}

/// Control surface of a running stream
pub trait StreamControl: Send + Sync {
    fn pause(&self) -> MusicResult<()>;
    fn resume(&self) -> MusicResult<()>;
    fn stop(&self) -> MusicResult<()>;
}

/// A stream handed back by the driver, with the signal fired once it ends.
pub struct StartedStream {
    pub control: Box<dyn StreamControl>,
    pub finished: oneshot::Receiver<StreamEnd>,
}

#[async_trait]
pub trait VoiceDriver: Send + Sync {
    /// Connect to `channel_id`, moving an existing connection if there is one.
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> MusicResult<()>;

    async fn disconnect(&self, guild_id: GuildId) -> MusicResult<()>;

    /// Start `request` on the guild's connection, replacing anything it was playing.
    async fn start_stream(
        &self,
        guild_id: GuildId,
        request: PlaybackRequest,
    ) -> MusicResult<StartedStream>;
}

/// Voice driver backed by songbird, feeding it the output of an ffmpeg child.
pub struct SongbirdDriver {
    songbird: Arc<Songbird>,
}

impl SongbirdDriver {
    pub fn new(songbird: Arc<Songbird>) -> Self {
        Self { songbird }
    }

    /// Get the current voice channel call handle
    fn get_call(&self, guild_id: GuildId) -> MusicResult<Arc<SerenityMutex<Call>>> {
        self.songbird.get(guild_id).ok_or(MusicError::NotConnected)
    }
}

#[async_trait]
impl VoiceDriver for SongbirdDriver {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> MusicResult<()> {
        self.songbird
            .join(guild_id, channel_id)
            .await
            .map(|_| ())
            .map_err(join_failure)
    }

    async fn disconnect(&self, guild_id: GuildId) -> MusicResult<()> {
        if self.songbird.get(guild_id).is_none() {
            return Err(MusicError::NotConnected);
        }

        self.songbird
            .remove(guild_id)
            .await
            .map_err(|e| MusicError::PlaybackError(format!("Failed to leave voice channel: {}", e)))
    }

    async fn start_stream(
        &self,
        guild_id: GuildId,
        request: PlaybackRequest,
    ) -> MusicResult<StartedStream> {
        let call = self.get_call(guild_id)?;

        debug!("Spawning transcoder for '{}' in guild {}", request.title, guild_id);
        let mut child = request.command().spawn().map_err(|e| {
            MusicError::PlaybackError(format!(
                "Failed to start {}: {}",
                request.options.program, e
            ))
        })?;
        if let Some(stderr) = child.stderr.take() {
            tokio::task::spawn_blocking(move || relay_transcoder_log(guild_id, stderr));
        }
        let input: Input = ChildContainer::from(child).into();

        let track = {
            let mut handler = call.lock().await;
            handler.play_only_input(input)
        };
        info!("Started '{}' in guild {}", request.title, guild_id);

        let (notifier, finished) = TrackEndNotifier::channel(guild_id, request.title);
        for event in [TrackEvent::End, TrackEvent::Error] {
            track
                .add_event(Event::Track(event), notifier.clone())
                .map_err(|e| MusicError::PlaybackError(e.to_string()))?;
        }

        Ok(StartedStream {
            control: Box::new(SongbirdStream(track)),
            finished,
        })
    }
}

/// Discord never answers a join the bot may not perform, so a timeout usually
/// means a missing channel permission.
fn join_failure(err: JoinError) -> MusicError {
    match err {
        JoinError::TimedOut => MusicError::JoinError(
            "timed out. Check that I have the Connect and Speak permissions in that channel."
                .to_string(),
        ),
        other => MusicError::JoinError(other.to_string()),
    }
}

/// Forward ffmpeg's stderr into the log until the process closes it.
fn relay_transcoder_log<R: Read>(guild_id: GuildId, reader: R) -> usize {
    let mut relayed = 0;
    for line in BufReader::new(reader).lines().map_while(Result::ok) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        warn!("ffmpeg in guild {}: {}", guild_id, line);
        relayed += 1;
    }
    relayed
}

struct SongbirdStream(TrackHandle);

impl StreamControl for SongbirdStream {
    fn pause(&self) -> MusicResult<()> {
        self.0
            .pause()
            .map_err(|e| MusicError::PlaybackError(e.to_string()))
    }

    fn resume(&self) -> MusicResult<()> {
        self.0
            .play()
            .map_err(|e| MusicError::PlaybackError(e.to_string()))
    }

    fn stop(&self) -> MusicResult<()> {
        self.0
            .stop()
            .map_err(|e| MusicError::PlaybackError(e.to_string()))
    }
}
