use std::sync::{Arc, Mutex};

use serenity::async_trait;
use serenity::model::id::GuildId;
use songbird::tracks::PlayMode;
use tokio::sync::oneshot;
use tracing::{debug, error};

use super::voice_driver::StreamEnd;

/// Event handler for when a stream ends or errors.
///
/// Registered for both `TrackEvent::End` and `TrackEvent::Error`; whichever
/// fires first delivers the signal, later events are ignored.
#[derive(Clone)]
pub struct TrackEndNotifier {
    guild_id: GuildId,
    title: String,
    sender: Arc<Mutex<Option<oneshot::Sender<StreamEnd>>>>,
}

impl TrackEndNotifier {
    pub fn channel(
        guild_id: GuildId,
        title: String,
    ) -> (Self, oneshot::Receiver<StreamEnd>) {
        let (tx, rx) = oneshot::channel();
        let notifier = Self {
            guild_id,
            title,
            sender: Arc::new(Mutex::new(Some(tx))),
        };
        (notifier, rx)
    }

    /// Deliver `end` to the waiting side. Returns false if it was already delivered.
    pub fn notify(&self, end: StreamEnd) -> bool {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match sender {
            Some(tx) => {
                debug!(
                    "Stream '{}' in guild {} ended: {:?}",
                    self.title, self.guild_id, end
                );
                tx.send(end).is_ok()
            }
            None => false,
        }
    }
}

#[async_trait]
impl songbird::EventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        if let songbird::EventContext::Track(tracks) = ctx {
            let end = tracks
                .iter()
                .find_map(|(state, _)| match &state.playing {
                    PlayMode::Errored(e) => Some(StreamEnd::Failed(format!("{:?}", e))),
                    _ => None,
                })
                .unwrap_or(StreamEnd::Finished);

            if let StreamEnd::Failed(reason) = &end {
                error!(
                    "Playback error in guild {} for '{}': {}",
                    self.guild_id, self.title, reason
                );
            }
            self.notify(end);
        }
        None
    }
}
