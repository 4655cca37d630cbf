use super::*;
use crate::author_voice_channel;
use crate::utils::embedded_messages;
use tracing::{info, warn};

/// Play a song from YouTube or a direct URL
#[poise::command(
    slash_command,
    guild_only,
    category = "Music",
    required_bot_permissions = "CONNECT | SPEAK"
)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "URL or search query"] query: String,
) -> CommandResult {
    info!("Received play command with query: {}", query);
    let guild_id = require_guild(&ctx)?;
    let user_channel = author_voice_channel(ctx, guild_id);

    // Resolving the query can take a few seconds
    ctx.defer().await?;

    match ctx.data().playback.play(guild_id, user_channel, &query).await {
        Ok(outcome) => {
            ctx.send(embedded_messages::now_playing(&outcome)).await?;
        }
        Err(err) => {
            warn!("Failed to play '{}' in guild {}: {}", query, guild_id, err);
            ctx.send(embedded_messages::music_error(&err)).await?;
        }
    }

    Ok(())
}
