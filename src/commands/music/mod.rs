pub(crate) mod join;
pub(crate) mod leave;
pub(crate) mod pause;
pub(crate) mod play;
pub(crate) mod resume;
pub(crate) mod stop;

pub mod audio_sources;
pub mod utils;

use crate::{CommandResult, Context, Error};
use serenity::model::id::GuildId;
use utils::music_manager::MusicError;

fn require_guild(ctx: &Context<'_>) -> Result<GuildId, Error> {
    ctx.guild_id()
        .ok_or_else(|| Box::new(MusicError::NotInGuild) as Error)
}
