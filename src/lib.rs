//! Jukebox: a small Discord bot that streams audio into voice channels.
//!
//! Command handlers live under [`commands`]; the per-guild voice sessions and
//! the playback pipeline live under [`commands::music::utils`].

// `src/test_support.rs` refers to the crate as `jukebox`.
extern crate self as jukebox;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serenity::model::id::{ChannelId, GuildId};
use tracing::{error, warn};

pub mod commands;
pub mod config;
pub mod events;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

use commands::{
    admins::clear::*,
    general::{help::*, info::*, ping::*},
    music::{
        audio_sources::MediaResolver,
        join::*, leave::*, pause::*, play::*, resume::*, stop::*,
        utils::{
            music_manager::VoiceSessions,
            playback::{PlaybackInvoker, TransportOptions},
            voice_driver::VoiceDriver,
        },
    },
};

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

/// Broad category of a failure, used to pick the reply shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The command cannot run in the current state (no voice channel, nothing playing...).
    Precondition,
    /// The invoking member lacks a required permission.
    Permission,
    /// A query could not be turned into a playable stream.
    Resolution,
    /// Discord, the voice connection, or ffmpeg failed.
    Transport,
}

/// User data, which is stored and accessible in all command invocations
pub struct Data {
    pub sessions: Arc<VoiceSessions>,
    pub playback: PlaybackInvoker,
    pub launch_time: DateTime<Utc>,
}

impl Data {
    pub fn new(
        driver: Arc<dyn VoiceDriver>,
        resolver: Arc<dyn MediaResolver>,
        options: TransportOptions,
        auto_join: bool,
    ) -> Self {
        let sessions = Arc::new(VoiceSessions::new(driver));
        let playback =
            PlaybackInvoker::new(Arc::clone(&sessions), resolver, options).with_auto_join(auto_join);

        Self {
            sessions,
            playback,
            launch_time: Utc::now(),
        }
    }
}

/// Every slash command the bot registers.
pub fn commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        // Music commands
        join(),
        leave(),
        play(),
        pause(),
        resume(),
        stop(),
        // General commands
        ping(),
        info(),
        help(),
        // Admin commands
        clear(),
    ]
}

/// Last line of defence for errors escaping a command handler.
pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start the framework: {}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(
                "Unhandled error in command '{}': {}",
                ctx.command().qualified_name,
                error
            );
            if let Err(e) = ctx.send(utils::embedded_messages::unexpected_error()).await {
                warn!("Failed to report command error: {}", e);
            }
        }
        poise::FrameworkError::MissingUserPermissions { ctx, .. } => {
            if let Err(e) = ctx.send(utils::embedded_messages::missing_permissions()).await {
                warn!("Failed to report missing permissions: {}", e);
            }
        }
        poise::FrameworkError::MissingBotPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            warn!(
                "Missing bot permissions for '{}': {}",
                ctx.command().qualified_name,
                missing_permissions
            );
            let reply = utils::embedded_messages::bot_missing_permissions(missing_permissions);
            if let Err(e) = ctx.send(reply).await {
                warn!("Failed to report missing bot permissions: {}", e);
            }
        }
        poise::FrameworkError::GuildOnly { ctx, .. } => {
            if let Err(e) = ctx.send(utils::embedded_messages::guild_only()).await {
                warn!("Failed to report guild-only violation: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

/// The voice channel the invoking user currently sits in, read from the cache.
pub fn author_voice_channel(
    ctx: Context<'_>,
    guild_id: GuildId,
) -> Option<ChannelId> {
    let guild = ctx.serenity_context().cache.guild(guild_id)?;
    guild
        .voice_states
        .get(&ctx.author().id)
        .and_then(|voice_state| voice_state.channel_id)
}
