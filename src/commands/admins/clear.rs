//! `/clear`: delete the most recent messages of a channel.

use std::sync::Arc;

use futures::future::try_join_all;
use serenity::all::GetMessages;
use serenity::async_trait;
use serenity::http::Http;
use serenity::model::id::{ChannelId, MessageId};
use serenity::model::Permissions;
use thiserror::Error;
use tracing::{info, warn};

use super::*;
use crate::ErrorKind;
use crate::utils::embedded_messages;

pub const DEFAULT_CLEAR_AMOUNT: u8 = 10;
pub const MAX_CLEAR_AMOUNT: u8 = 100;

/// Discord refuses to bulk delete messages older than two weeks.
const BULK_DELETE_MAX_AGE_SECS: i64 = 14 * 24 * 60 * 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdminError {
    #[error("You need the Manage Messages permission to use this command")]
    PermissionDenied,

    #[error("Amount must be between 1 and {max}, got {0}", max = MAX_CLEAR_AMOUNT)]
    InvalidAmount(u8),

    #[error("Discord rejected the request: {0}")]
    Discord(String),
}

impl AdminError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdminError::PermissionDenied => ErrorKind::Permission,
            AdminError::InvalidAmount(_) => ErrorKind::Precondition,
            AdminError::Discord(_) => ErrorKind::Transport,
        }
    }
}

impl From<serenity::Error> for AdminError {
    fn from(err: serenity::Error) -> Self {
        AdminError::Discord(err.to_string())
    }
}

/// The message operations `/clear` needs from a channel.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Ids of the newest `limit` messages, newest first.
    async fn recent_messages(
        &self,
        channel_id: ChannelId,
        limit: u8,
    ) -> Result<Vec<MessageId>, AdminError>;

    /// Delete 2 to 100 messages younger than two weeks in one request.
    async fn delete_bulk(&self, channel_id: ChannelId, ids: &[MessageId]) -> Result<(), AdminError>;

    async fn delete_one(&self, channel_id: ChannelId, id: MessageId) -> Result<(), AdminError>;
}

/// [`MessageStore`] backed by the Discord REST API.
pub struct HttpMessageStore {
    http: Arc<Http>,
}

impl HttpMessageStore {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl MessageStore for HttpMessageStore {
    async fn recent_messages(
        &self,
        channel_id: ChannelId,
        limit: u8,
    ) -> Result<Vec<MessageId>, AdminError> {
        let messages = channel_id
            .messages(self.http.as_ref(), GetMessages::new().limit(limit))
            .await?;
        Ok(messages.into_iter().map(|message| message.id).collect())
    }

    async fn delete_bulk(&self, channel_id: ChannelId, ids: &[MessageId]) -> Result<(), AdminError> {
        channel_id
            .delete_messages(self.http.as_ref(), ids)
            .await
            .map_err(AdminError::from)
    }

    async fn delete_one(&self, channel_id: ChannelId, id: MessageId) -> Result<(), AdminError> {
        channel_id
            .delete_message(self.http.as_ref(), id)
            .await
            .map_err(AdminError::from)
    }
}

/// Whether the resolved member permissions allow deleting other people's messages.
pub fn can_manage_messages(permissions: Option<Permissions>) -> bool {
    permissions.is_some_and(|p| {
        p.contains(Permissions::MANAGE_MESSAGES) || p.contains(Permissions::ADMINISTRATOR)
    })
}

/// Split ids into those that can be bulk deleted and those that are too old.
pub fn split_by_age(ids: Vec<MessageId>, now_unix: i64) -> (Vec<MessageId>, Vec<MessageId>) {
    let cutoff = now_unix - BULK_DELETE_MAX_AGE_SECS;
    ids.into_iter()
        .partition(|id| id.created_at().unix_timestamp() > cutoff)
}

/// Delete the `amount` most recent messages of `channel_id`, returning how many went.
pub async fn clear_recent(
    store: &dyn MessageStore,
    channel_id: ChannelId,
    permissions: Option<Permissions>,
    amount: u8,
    now_unix: i64,
) -> Result<usize, AdminError> {
    if !can_manage_messages(permissions) {
        return Err(AdminError::PermissionDenied);
    }
    if amount == 0 || amount > MAX_CLEAR_AMOUNT {
        return Err(AdminError::InvalidAmount(amount));
    }

    let mut ids = store.recent_messages(channel_id, amount).await?;
    ids.truncate(amount as usize);
    let total = ids.len();

    let (fresh, stale) = split_by_age(ids, now_unix);
    match fresh.as_slice() {
        [] => {}
        [single] => store.delete_one(channel_id, *single).await?,
        many => store.delete_bulk(channel_id, many).await?,
    }

    if !stale.is_empty() {
        warn!(
            "Deleting {} message(s) older than two weeks one by one in channel {}",
            stale.len(),
            channel_id
        );
        try_join_all(stale.iter().map(|id| store.delete_one(channel_id, *id))).await?;
    }

    Ok(total)
}

/// Delete recent messages in this channel
#[poise::command(
    slash_command,
    guild_only,
    category = "Admin",
    default_member_permissions = "MANAGE_MESSAGES"
)]
pub async fn clear(
    ctx: Context<'_>,
    #[description = "Number of messages to delete (default 10)"]
    #[min = 1]
    #[max = 100]
    amount: Option<u8>,
) -> CommandResult {
    let amount = amount.unwrap_or(DEFAULT_CLEAR_AMOUNT);
    let permissions = ctx
        .author_member()
        .await
        .and_then(|member| member.permissions);

    ctx.defer_ephemeral().await?;

    let store = HttpMessageStore::new(Arc::clone(&ctx.serenity_context().http));
    let now = chrono::Utc::now().timestamp();
    let reply = match clear_recent(&store, ctx.channel_id(), permissions, amount, now).await {
        Ok(deleted) => {
            info!(
                "{} cleared {} message(s) in channel {}",
                ctx.author().name,
                deleted,
                ctx.channel_id()
            );
            embedded_messages::cleared(deleted)
        }
        Err(err) => {
            warn!("Clear failed in channel {}: {}", ctx.channel_id(), err);
            embedded_messages::admin_error(&err)
        }
    };
    ctx.send(reply).await?;

    Ok(())
}
