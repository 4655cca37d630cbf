pub(crate) mod help;
pub(crate) mod info;
pub(crate) mod ping;

use std::time::Duration;

use crate::{CommandResult, Context};

/// Heartbeat latency of the shard the command arrived on.
async fn shard_latency(ctx: &Context<'_>) -> Option<Duration> {
    // The shard manager is an interface for mutating, stopping, restarting, and
    // retrieving information about shards.
    let shard_manager = ctx.framework().shard_manager();
    let runners = shard_manager.runners.lock().await;

    // Each shard is backed by a runner; latency is only known after the first
    // heartbeat acknowledgement.
    let runner = runners.get(&ctx.serenity_context().shard_id)?;
    runner.latency
}
