use poise::CreateReply;
use serenity::all::{CreateEmbed, CreateEmbedFooter, Mentionable, MessageBuilder};
use serenity::model::Permissions;

use crate::ErrorKind;
use crate::commands::admins::clear::AdminError;
use crate::commands::music::audio_sources::TrackMetadata;
use crate::commands::music::utils::{
    format_duration,
    music_manager::{JoinOutcome, MusicError},
    playback::PlayOutcome,
};

const SUCCESS: u32 = 0x00ff00;
const FAILURE: u32 = 0xff0000;

/// Parse the metadata for the now playing embed
fn parse_metadata(metadata: &TrackMetadata) -> (String, String) {
    let title = MessageBuilder::new()
        .push_bold_safe(metadata.title.as_str())
        .build();
    let duration_str = metadata
        .duration
        .map(format_duration)
        .unwrap_or_else(|| "Unknown duration".to_string());

    (title, duration_str)
}

fn error_embed(description: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new()
        .title("❌ Error")
        .description(description)
        .color(FAILURE)
}

/// Ephemeral error reply for a failed music command
pub fn music_error(err: &MusicError) -> CreateReply {
    let description = match err.kind() {
        ErrorKind::Transport => format!("{}\nPlease try again in a moment.", err),
        _ => err.to_string(),
    };
    CreateReply::default()
        .embed(error_embed(description))
        .ephemeral(true)
}

/// Ephemeral error reply for a failed admin command
pub fn admin_error(err: &AdminError) -> CreateReply {
    CreateReply::default()
        .embed(error_embed(err.to_string()))
        .ephemeral(true)
}

/// Create an embed for when the bot joins or moves voice channels
pub fn joined(outcome: &JoinOutcome) -> CreateReply {
    let description = match outcome {
        JoinOutcome::Joined(channel) => format!("Joined {}", channel.mention()),
        JoinOutcome::Moved { to, .. } => format!("Moved to {}", to.mention()),
        JoinOutcome::AlreadyConnected(channel) => {
            format!("Already connected to {}", channel.mention())
        }
    };

    CreateReply::default().embed(
        CreateEmbed::new()
            .title("🔊 Voice")
            .description(description)
            .color(SUCCESS),
    )
}

/// Create an embed for when the bot leaves the voice channel
pub fn left_voice_channel() -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("👋 Disconnected")
            .description("Left the voice channel")
            .color(SUCCESS),
    )
}

/// Create an embed for when a song starts playing
pub fn now_playing(outcome: &PlayOutcome) -> CreateReply {
    let metadata = &outcome.metadata;
    let (title, duration_str) = parse_metadata(metadata);

    let mut embed = CreateEmbed::new()
        .title("🎵 Now Playing")
        .description(title)
        .field("Duration", format!("`{}`", duration_str), true)
        .color(SUCCESS);

    if let Some(url) = &metadata.url {
        embed = embed.url(url);
    }
    if let Some(thumbnail) = &metadata.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }
    if outcome.replaced {
        embed = embed.footer(CreateEmbedFooter::new(
            "The previous stream was stopped",
        ));
    }

    CreateReply::default().embed(embed)
}

/// Create an embed for when a track is paused
pub fn paused(metadata: &TrackMetadata) -> CreateReply {
    let (title, _) = parse_metadata(metadata);
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("⏸️ Paused")
            .description(format!("Paused {}", title))
            .color(SUCCESS),
    )
}

/// Create an embed for when a track is resumed
pub fn resumed(metadata: &TrackMetadata) -> CreateReply {
    let (title, _) = parse_metadata(metadata);
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("▶️ Resumed")
            .description(format!("Resumed {}", title))
            .color(SUCCESS),
    )
}

/// Create an embed for when playback is stopped
pub fn stopped(metadata: Option<&TrackMetadata>) -> CreateReply {
    let description = match metadata {
        Some(metadata) => format!("Stopped {}", parse_metadata(metadata).0),
        None => "Nothing was playing".to_string(),
    };

    CreateReply::default().embed(
        CreateEmbed::new()
            .title("⏹️ Stopped")
            .description(description)
            .color(SUCCESS),
    )
}

/// Create an embed reporting how many messages `/clear` removed
pub fn cleared(deleted: usize) -> CreateReply {
    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title("🧹 Cleared")
                .description(format!("Deleted {} message(s).", deleted))
                .color(SUCCESS),
        )
        .ephemeral(true)
}

pub fn missing_permissions() -> CreateReply {
    CreateReply::default()
        .embed(error_embed(
            "You need the Manage Messages permission to do that.",
        ))
        .ephemeral(true)
}

/// Text for when the bot itself lacks permissions in this channel
pub fn bot_missing_permissions_text(missing: Permissions) -> String {
    format!(
        "I don't have permission to complete that action. Missing: {}.",
        missing
    )
}

pub fn bot_missing_permissions(missing: Permissions) -> CreateReply {
    CreateReply::default()
        .embed(error_embed(bot_missing_permissions_text(missing)))
        .ephemeral(true)
}

pub fn guild_only() -> CreateReply {
    CreateReply::default()
        .embed(error_embed("This command only works inside a server."))
        .ephemeral(true)
}

pub fn unexpected_error() -> CreateReply {
    CreateReply::default()
        .embed(error_embed(
            "Something unexpected happened. Please try again or contact an admin if it continues.",
        ))
        .ephemeral(true)
}
