use poise::CreateReply;
use serenity::all::CreateEmbed;

use super::*;

/// Ping the bot to check its latency
#[poise::command(slash_command, category = "General")]
pub async fn ping(ctx: Context<'_>) -> CommandResult {
    let latency = match shard_latency(&ctx).await {
        Some(latency) => format!("{} ms", latency.as_millis()),
        None => "Not measured yet".to_string(),
    };

    let embed = CreateEmbed::new()
        .title("Pong!")
        .field("API Latency", latency, false)
        .color(0x00ff00);

    ctx.send(CreateReply::default().embed(embed)).await?;

    Ok(())
}
