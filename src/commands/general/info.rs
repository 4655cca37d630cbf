use chrono::Utc;
use poise::CreateReply;
use serenity::all::{CreateEmbed, CreateEmbedFooter};

use super::*;
use crate::commands::music::audio_sources::TrackMetadata;

const LIBRARIES: &str = "serenity · poise · songbird";

/// Render an uptime like `1d 2h 3m 4s`, leaving out zero units.
pub fn format_uptime(total_seconds: u64) -> String {
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    parts.push(format!("{}s", seconds));

    parts.join(" ")
}

/// What the guild is streaming, for the info embed.
pub fn now_playing_line(now_playing: Option<&(TrackMetadata, bool)>) -> String {
    match now_playing {
        Some((metadata, true)) => format!("⏸️ {} (paused)", metadata.title),
        Some((metadata, false)) => format!("▶️ {}", metadata.title),
        None => "Nothing".to_string(),
    }
}

/// Show information about the bot
#[poise::command(slash_command, category = "General")]
pub async fn info(ctx: Context<'_>) -> CommandResult {
    let data = ctx.data();
    let uptime = (Utc::now() - data.launch_time).num_seconds().max(0) as u64;
    let latency = shard_latency(&ctx)
        .await
        .map(|latency| format!("{} ms", latency.as_millis()))
        .unwrap_or_else(|| "Not measured yet".to_string());
    let sessions = data.sessions.connection_count().await;
    let now_playing = match ctx.guild_id() {
        Some(guild_id) => data.playback.now_playing(guild_id).await,
        None => None,
    };

    let embed = CreateEmbed::new()
        .title(format!("🎶 {}", env!("CARGO_PKG_NAME")))
        .description(env!("CARGO_PKG_DESCRIPTION"))
        .field("Version", env!("CARGO_PKG_VERSION"), true)
        .field("Uptime", format_uptime(uptime), true)
        .field("Latency", latency, true)
        .field("Voice sessions", sessions.to_string(), true)
        .field("Built with", LIBRARIES, true)
        .field("Now playing", now_playing_line(now_playing.as_ref()), false)
        .footer(CreateEmbedFooter::new("Use /help to see every command"))
        .color(0x00ff00);

    ctx.send(CreateReply::default().embed(embed)).await?;

    Ok(())
}
