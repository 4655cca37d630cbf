//! This module aggregates utility submodules shared by every command group.

/// Builders for the embeds the bot replies with.
pub mod embedded_messages;
