use super::*;
use crate::utils::embedded_messages;

/// Pause the current track
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn pause(ctx: Context<'_>) -> CommandResult {
    let guild_id = require_guild(&ctx)?;

    let reply = match ctx.data().playback.pause(guild_id).await {
        Ok(metadata) => embedded_messages::paused(&metadata),
        Err(err) => embedded_messages::music_error(&err),
    };
    ctx.send(reply).await?;

    Ok(())
}
