//! Runtime configuration, read from the environment (and `.env` via `dotenv`).

use std::{env, fmt};

use serenity::model::id::GuildId;
use thiserror::Error;

use crate::commands::music::utils::playback::TransportOptions;

/// Errors that prevent the bot from starting
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DISCORD_TOKEN is not set. Add it to your .env file.")]
    MissingToken,

    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    /// Register commands in this guild only, which makes them show up immediately.
    pub dev_guild_id: Option<GuildId>,
    pub yt_dlp_path: String,
    pub ffmpeg_path: String,
    /// Whether `/play` may connect to the caller's channel on its own.
    pub auto_join: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("DISCORD_TOKEN")
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let dev_guild_id = match lookup("DEV_GUILD_ID").filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|id| *id != 0)
                    .map(GuildId::new)
                    .ok_or(ConfigError::InvalidValue {
                        name: "DEV_GUILD_ID",
                        value: raw,
                    })?,
            ),
            None => None,
        };

        let auto_join = match lookup("MUSIC_AUTO_JOIN") {
            Some(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidValue {
                name: "MUSIC_AUTO_JOIN",
                value: raw,
            })?,
            None => true,
        };

        Ok(Self {
            discord_token,
            dev_guild_id,
            yt_dlp_path: lookup("YTDLP_PATH").unwrap_or_else(|| "yt-dlp".to_string()),
            ffmpeg_path: lookup("FFMPEG_PATH").unwrap_or_else(|| "ffmpeg".to_string()),
            auto_join,
        })
    }

    /// The ffmpeg option set shared by every playback in this process.
    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions::new(self.ffmpeg_path.clone())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"<redacted>")
            .field("dev_guild_id", &self.dev_guild_id)
            .field("yt_dlp_path", &self.yt_dlp_path)
            .field("ffmpeg_path", &self.ffmpeg_path)
            .field("auto_join", &self.auto_join)
            .finish()
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
