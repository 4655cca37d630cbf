//! Gateway events the bot reacts to outside of slash commands.

use serenity::all::{FullEvent, VoiceState};
use serenity::client::Context as SerenityContext;
use serenity::model::id::{ChannelId, GuildId};
use tracing::{debug, info};

use crate::commands::music::utils::music_manager::VoiceSessions;
use crate::{Data, Error};

pub async fn event_handler(
    ctx: &SerenityContext,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            info!(
                "Logged in as {} in {} guild(s)",
                data_about_bot.user.name,
                data_about_bot.guilds.len()
            );
        }
        FullEvent::VoiceStateUpdate { new, .. } => {
            if new.user_id == ctx.cache.current_user().id {
                own_voice_state_changed(&data.sessions, new).await;
            }
        }
        _ => {}
    }

    Ok(())
}

async fn own_voice_state_changed(sessions: &VoiceSessions, state: &VoiceState) {
    if let Some(guild_id) = state.guild_id {
        handle_own_voice_state(sessions, guild_id, state.channel_id).await;
    }
}

/// Keep the session store in line with where Discord says the bot is.
///
/// A `None` channel means the bot was disconnected, for example kicked by a
/// moderator, so the stored session and its stream are dropped.
pub async fn handle_own_voice_state(
    sessions: &VoiceSessions,
    guild_id: GuildId,
    channel_id: Option<ChannelId>,
) {
    match channel_id {
        Some(channel_id) => sessions.track_move(guild_id, channel_id).await,
        None => {
            if sessions.forget(guild_id).await {
                info!("Disconnected from voice in guild {}, session dropped", guild_id);
            } else {
                debug!("Voice disconnect in guild {} with no stored session", guild_id);
            }
        }
    }
}
