use super::*;
use crate::utils::embedded_messages;

/// Stop playback, staying in the voice channel
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn stop(ctx: Context<'_>) -> CommandResult {
    let guild_id = require_guild(&ctx)?;

    let reply = match ctx.data().playback.stop(guild_id).await {
        Ok(stopped) => embedded_messages::stopped(stopped.as_ref()),
        Err(err) => embedded_messages::music_error(&err),
    };
    ctx.send(reply).await?;

    Ok(())
}
