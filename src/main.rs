use std::sync::Arc;

use dotenv::dotenv;
use serenity::all::{ClientBuilder, GatewayIntents};
use songbird::{SerenityInit, Songbird};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use jukebox::{
    Data, Error,
    commands::music::{audio_sources::youtube::YtDlpResolver, utils::voice_driver::SongbirdDriver},
    config::Config,
    events::event_handler,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("jukebox=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    let config = Config::from_env()?;
    info!("Starting with {:?}", config);

    let intents = GatewayIntents::non_privileged() | GatewayIntents::GUILD_VOICE_STATES;

    let songbird = Songbird::serenity();
    let data = Data::new(
        Arc::new(SongbirdDriver::new(Arc::clone(&songbird))),
        Arc::new(YtDlpResolver::new(config.yt_dlp_path.clone())),
        config.transport_options(),
        config.auto_join,
    );

    let dev_guild_id = config.dev_guild_id;
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: jukebox::commands(),
            on_error: |error| Box::pin(jukebox::on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                let commands = &framework.options().commands;
                match dev_guild_id {
                    Some(guild_id) => {
                        poise::builtins::register_in_guild(ctx, commands, guild_id).await?;
                        info!("Registered {} commands in guild {}", commands.len(), guild_id);
                    }
                    None => {
                        poise::builtins::register_globally(ctx, commands).await?;
                        info!("Registered {} commands globally", commands.len());
                    }
                }
                Ok(data)
            })
        })
        .build();

    let mut client = ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .register_songbird_with(songbird)
        .await?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        info!("Received Ctrl-C, shutting down");
        shard_manager.shutdown_all().await;
    });

    client.start().await.map_err(Into::into)
}
