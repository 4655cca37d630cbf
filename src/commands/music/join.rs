use super::*;
use crate::author_voice_channel;
use crate::utils::embedded_messages;

/// Join your voice channel
#[poise::command(
    slash_command,
    guild_only,
    category = "Music",
    required_bot_permissions = "CONNECT | SPEAK"
)]
pub async fn join(ctx: Context<'_>) -> CommandResult {
    let guild_id = require_guild(&ctx)?;
    let user_channel = author_voice_channel(ctx, guild_id);

    match ctx.data().sessions.join(guild_id, user_channel).await {
        Ok(outcome) => {
            ctx.send(embedded_messages::joined(&outcome)).await?;
        }
        Err(err) => {
            ctx.send(embedded_messages::music_error(&err)).await?;
        }
    }

    Ok(())
}
