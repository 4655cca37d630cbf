//! This module aggregates all the command modules for the bot.

/// Moderation commands (e.g., clearing messages).
pub mod admins;
/// General purpose commands (e.g., ping, help).
pub mod general;
/// Commands related to voice channels and music playback.
pub mod music;
