use super::*;
use crate::utils::embedded_messages;

/// Leave the voice channel
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn leave(ctx: Context<'_>) -> CommandResult {
    let guild_id = require_guild(&ctx)?;

    match ctx.data().sessions.leave(guild_id).await {
        Ok(_) => {
            ctx.send(embedded_messages::left_voice_channel()).await?;
        }
        Err(err) => {
            ctx.send(embedded_messages::music_error(&err)).await?;
        }
    }

    Ok(())
}
