use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::ErrorKind;
use crate::commands::music::audio_sources::TrackMetadata;

use super::voice_driver::{StreamControl, VoiceDriver};

/// Errors that can occur during music operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MusicError {
    #[error("This command only works inside a server.")]
    NotInGuild,

    #[error("You need to be connected to a voice channel first.")]
    UserNotInVoiceChannel,

    #[error("I'm not connected to a voice channel.")]
    NotConnected,

    #[error("Nothing is playing right now.")]
    NothingPlaying,

    #[error("Playback is not paused.")]
    NotPaused,

    #[error("{0}")]
    AudioSourceError(String),

    #[error("Couldn't connect to the voice channel: {0}")]
    JoinError(String),

    #[error("Playback failed: {0}")]
    PlaybackError(String),
}

impl MusicError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MusicError::NotInGuild
            | MusicError::UserNotInVoiceChannel
            | MusicError::NotConnected
            | MusicError::NothingPlaying
            | MusicError::NotPaused => ErrorKind::Precondition,
            MusicError::AudioSourceError(_) => ErrorKind::Resolution,
            MusicError::JoinError(_) | MusicError::PlaybackError(_) => ErrorKind::Transport,
        }
    }
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

/// A stream currently owned by a guild's voice connection.
pub struct ActiveStream {
    pub id: u64,
    pub metadata: TrackMetadata,
    pub paused: bool,
    pub(crate) control: Box<dyn StreamControl>,
}

impl ActiveStream {
    pub(crate) fn halt(self, guild_id: GuildId) {
        if let Err(e) = self.control.stop() {
            warn!(
                "Failed to stop stream '{}' in guild {}: {}",
                self.metadata.title, guild_id, e
            );
        }
    }
}

/// What the bot holds for a guild while it sits in a voice channel.
pub struct GuildVoiceState {
    pub channel_id: ChannelId,
    pub stream: Option<ActiveStream>,
}

impl GuildVoiceState {
    fn new(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            stream: None,
        }
    }
}

pub(crate) type GuildSlot = Arc<Mutex<Option<GuildVoiceState>>>;

/// Result of a successful join request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined(ChannelId),
    Moved { from: ChannelId, to: ChannelId },
    AlreadyConnected(ChannelId),
}

/// Keyed store of voice connections, one slot per guild.
///
/// Each slot is guarded by its own async mutex which is held for the whole of
/// an operation, so commands for the same guild run one after another while
/// other guilds are unaffected.
pub struct VoiceSessions {
    driver: Arc<dyn VoiceDriver>,
    slots: DashMap<GuildId, GuildSlot>,
}

impl VoiceSessions {
    pub fn new(driver: Arc<dyn VoiceDriver>) -> Self {
        Self {
            driver,
            slots: DashMap::new(),
        }
    }

    pub(crate) fn driver(&self) -> &dyn VoiceDriver {
        self.driver.as_ref()
    }

    /// The guild's slot, created on first use. Only paths that may connect call this.
    pub(crate) fn slot(&self, guild_id: GuildId) -> GuildSlot {
        self.slots.entry(guild_id).or_default().clone()
    }

    /// The guild's slot if it ever connected.
    pub(crate) fn existing_slot(&self, guild_id: GuildId) -> Option<GuildSlot> {
        self.slots.get(&guild_id).map(|entry| entry.value().clone())
    }

    #[cfg(test)]
    pub(crate) fn tracked_guilds(&self) -> usize {
        self.slots.len()
    }

    /// Join the caller's voice channel, or move there if connected elsewhere.
    pub async fn join(
        &self,
        guild_id: GuildId,
        user_channel: Option<ChannelId>,
    ) -> MusicResult<JoinOutcome> {
        let channel_id = user_channel.ok_or(MusicError::UserNotInVoiceChannel)?;

        let slot = self.slot(guild_id);
        let mut state = slot.lock().await;
        self.connect_locked(&mut state, guild_id, channel_id).await
    }

    /// Connect while the caller already holds the guild's slot.
    pub(crate) async fn connect_locked(
        &self,
        state: &mut Option<GuildVoiceState>,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> MusicResult<JoinOutcome> {
        if let Some(current) = state.as_mut() {
            if current.channel_id == channel_id {
                debug!(
                    "Already connected to channel {} in guild {}",
                    channel_id, guild_id
                );
                return Ok(JoinOutcome::AlreadyConnected(channel_id));
            }

            let from = current.channel_id;
            self.driver.connect(guild_id, channel_id).await?;
            current.channel_id = channel_id;
            info!(
                "Moved from channel {} to {} in guild {}",
                from, channel_id, guild_id
            );
            return Ok(JoinOutcome::Moved {
                from,
                to: channel_id,
            });
        }

        self.driver.connect(guild_id, channel_id).await?;
        *state = Some(GuildVoiceState::new(channel_id));
        info!("Joined channel {} in guild {}", channel_id, guild_id);
        Ok(JoinOutcome::Joined(channel_id))
    }

    /// Stop whatever is playing and disconnect.
    ///
    /// The stored state is dropped even if the driver fails to disconnect.
    pub async fn leave(&self, guild_id: GuildId) -> MusicResult<ChannelId> {
        let slot = self.existing_slot(guild_id).ok_or(MusicError::NotConnected)?;
        let mut state = slot.lock().await;

        let current = state.take().ok_or(MusicError::NotConnected)?;
        if let Some(stream) = current.stream {
            stream.halt(guild_id);
        }

        self.driver.disconnect(guild_id).await?;
        info!("Left channel {} in guild {}", current.channel_id, guild_id);

        Ok(current.channel_id)
    }

    /// Drop the stored state for a guild whose connection went away on its own.
    pub async fn forget(&self, guild_id: GuildId) -> bool {
        let Some(slot) = self.existing_slot(guild_id) else {
            return false;
        };
        let mut state = slot.lock().await;

        match state.take() {
            Some(current) => {
                if let Some(stream) = current.stream {
                    stream.halt(guild_id);
                }
                true
            }
            None => false,
        }
    }

    /// Record that the bot was moved to another channel outside of `/join`.
    pub async fn track_move(&self, guild_id: GuildId, channel_id: ChannelId) {
        let Some(slot) = self.existing_slot(guild_id) else {
            return;
        };
        let mut state = slot.lock().await;

        if let Some(current) = state.as_mut() {
            if current.channel_id != channel_id {
                debug!(
                    "Voice channel for guild {} changed from {} to {}",
                    guild_id, current.channel_id, channel_id
                );
                current.channel_id = channel_id;
            }
        }
    }

    pub async fn channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        let slot = self.existing_slot(guild_id)?;
        let state = slot.lock().await;
        state.as_ref().map(|current| current.channel_id)
    }

    pub async fn is_connected(&self, guild_id: GuildId) -> bool {
        self.channel(guild_id).await.is_some()
    }

    /// Number of guilds with a live voice connection.
    pub async fn connection_count(&self) -> usize {
        let slots: Vec<GuildSlot> = self.slots.iter().map(|entry| entry.value().clone()).collect();

        let mut count = 0;
        for slot in slots {
            if slot.lock().await.is_some() {
                count += 1;
            }
        }
        count
    }
}
