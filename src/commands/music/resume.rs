use super::*;
use crate::utils::embedded_messages;

/// Resume the paused track
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn resume(ctx: Context<'_>) -> CommandResult {
    let guild_id = require_guild(&ctx)?;

    let reply = match ctx.data().playback.resume(guild_id).await {
        Ok(metadata) => embedded_messages::resumed(&metadata),
        Err(err) => embedded_messages::music_error(&err),
    };
    ctx.send(reply).await?;

    Ok(())
}
