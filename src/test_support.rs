//! In-memory stand-ins for the voice transport, the media resolver and a
//! channel's message history.
//!
//! Shared by the unit tests and the `tests/` suite, which includes this file
//! directly, so every path goes through the `jukebox` crate name.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId, MessageId};
use tokio::sync::oneshot;

use jukebox::commands::admins::clear::{AdminError, MessageStore};
use jukebox::commands::music::audio_sources::{AudioSourceResult, MediaResolver, TrackMetadata};
use jukebox::commands::music::utils::music_manager::{MusicError, MusicResult};
use jukebox::commands::music::utils::playback::{PlaybackInvoker, PlaybackRequest};
use jukebox::commands::music::utils::voice_driver::{
    StartedStream, StreamControl, StreamEnd, VoiceDriver,
};

pub fn guild(id: u64) -> GuildId {
    GuildId::new(id)
}

pub fn channel(id: u64) -> ChannelId {
    ChannelId::new(id)
}

#[derive(Default)]
pub struct FakeStreamState {
    paused: AtomicBool,
    stopped: AtomicBool,
    fail_stop: AtomicBool,
    pauses: AtomicUsize,
    resumes: AtomicUsize,
}

impl FakeStreamState {
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn resumes(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }

    /// Make the next `stop` calls fail, leaving the stream running.
    pub fn fail_stop(&self, fail: bool) {
        self.fail_stop.store(fail, Ordering::SeqCst);
    }
}

struct FakeStream(Arc<FakeStreamState>);

impl StreamControl for FakeStream {
    fn pause(&self) -> MusicResult<()> {
        self.0.paused.store(true, Ordering::SeqCst);
        self.0.pauses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn resume(&self) -> MusicResult<()> {
        self.0.paused.store(false, Ordering::SeqCst);
        self.0.resumes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> MusicResult<()> {
        if self.0.fail_stop.load(Ordering::SeqCst) {
            return Err(MusicError::PlaybackError("track handle is gone".into()));
        }
        self.0.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct StreamRecord {
    request: PlaybackRequest,
    state: Arc<FakeStreamState>,
    finish: Option<oneshot::Sender<StreamEnd>>,
}

/// Records every call and hands out controllable streams.
#[derive(Default)]
pub struct FakeDriver {
    connects: Mutex<Vec<(GuildId, ChannelId)>>,
    disconnects: Mutex<Vec<GuildId>>,
    streams: Mutex<Vec<StreamRecord>>,
    fail_connects: AtomicBool,
}

impl FakeDriver {
    pub fn fail_connects(&self) {
        self.fail_connects.store(true, Ordering::SeqCst);
    }

    pub fn connects(&self) -> Vec<(GuildId, ChannelId)> {
        self.connects.lock().unwrap().clone()
    }

    pub fn disconnects(&self) -> Vec<GuildId> {
        self.disconnects.lock().unwrap().clone()
    }

    pub fn stream_count(&self) -> usize {
        self.streams.lock().unwrap().len()
    }

    /// Streams started and not stopped since.
    pub fn live_streams(&self) -> usize {
        self.streams
            .lock()
            .unwrap()
            .iter()
            .filter(|record| !record.state.is_stopped())
            .count()
    }

    pub fn stream(&self, index: usize) -> Arc<FakeStreamState> {
        self.streams.lock().unwrap()[index].state.clone()
    }

    pub fn request(&self, index: usize) -> PlaybackRequest {
        self.streams.lock().unwrap()[index].request.clone()
    }

    /// Fire the end signal of the `index`th stream.
    pub fn finish(&self, index: usize, end: StreamEnd) {
        let sender = self.streams.lock().unwrap()[index].finish.take();
        if let Some(tx) = sender {
            let _ = tx.send(end);
        }
    }
}

#[async_trait]
impl VoiceDriver for FakeDriver {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> MusicResult<()> {
        if self.fail_connects.load(Ordering::SeqCst) {
            return Err(MusicError::JoinError("gateway timed out".into()));
        }
        self.connects.lock().unwrap().push((guild_id, channel_id));
        Ok(())
    }

    async fn disconnect(&self, guild_id: GuildId) -> MusicResult<()> {
        self.disconnects.lock().unwrap().push(guild_id);
        Ok(())
    }

    async fn start_stream(
        &self,
        _guild_id: GuildId,
        request: PlaybackRequest,
    ) -> MusicResult<StartedStream> {
        let state = Arc::new(FakeStreamState::default());
        let (tx, rx) = oneshot::channel();
        self.streams.lock().unwrap().push(StreamRecord {
            request,
            state: state.clone(),
            finish: Some(tx),
        });

        Ok(StartedStream {
            control: Box::new(FakeStream(state)),
            finished: rx,
        })
    }
}

/// Resolves every query to a stream named after it, unless told to fail.
#[derive(Default)]
pub struct StubResolver {
    failure: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl StubResolver {
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaResolver for StubResolver {
    async fn resolve(&self, query: &str) -> AudioSourceResult<TrackMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(MusicError::AudioSourceError(message));
        }
        Ok(TrackMetadata::for_stream(
            query,
            format!("https://cdn.example.com/{}", query),
        ))
    }
}

/// A channel's message history kept in memory, newest first.
#[derive(Default)]
pub struct FakeMessageStore {
    messages: Mutex<Vec<MessageId>>,
    bulk_calls: Mutex<Vec<Vec<MessageId>>>,
    single_calls: Mutex<Vec<MessageId>>,
}

impl FakeMessageStore {
    pub fn with_messages(messages: Vec<MessageId>) -> Self {
        Self {
            messages: Mutex::new(messages),
            ..Default::default()
        }
    }

    pub fn remaining(&self) -> Vec<MessageId> {
        self.messages.lock().unwrap().clone()
    }

    pub fn bulk_calls(&self) -> Vec<Vec<MessageId>> {
        self.bulk_calls.lock().unwrap().clone()
    }

    pub fn single_calls(&self) -> Vec<MessageId> {
        self.single_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageStore for FakeMessageStore {
    async fn recent_messages(
        &self,
        _channel_id: ChannelId,
        limit: u8,
    ) -> Result<Vec<MessageId>, AdminError> {
        let messages = self.messages.lock().unwrap();
        Ok(messages.iter().take(limit as usize).copied().collect())
    }

    async fn delete_bulk(&self, _channel_id: ChannelId, ids: &[MessageId]) -> Result<(), AdminError> {
        self.bulk_calls.lock().unwrap().push(ids.to_vec());
        self.messages.lock().unwrap().retain(|id| !ids.contains(id));
        Ok(())
    }

    async fn delete_one(&self, _channel_id: ChannelId, id: MessageId) -> Result<(), AdminError> {
        self.single_calls.lock().unwrap().push(id);
        self.messages.lock().unwrap().retain(|m| *m != id);
        Ok(())
    }
}

/// Poll until the guild has no active stream, failing after a second.
pub async fn wait_until_idle(playback: &PlaybackInvoker, guild_id: GuildId) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while playback.now_playing(guild_id).await.is_some() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("stream never went idle");
}
