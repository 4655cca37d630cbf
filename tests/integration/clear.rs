use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serenity::model::Permissions;
use test_case::test_case;

use jukebox::ErrorKind;
use jukebox::commands::admins::clear::{AdminError, DEFAULT_CLEAR_AMOUNT, clear_recent};

use crate::common::fixtures::{NOW, recent_messages, text_channel};
use crate::common::mocks::FakeMessageStore;

#[tokio::test]
async fn admin_clear_five_deletes_the_five_most_recent() {
    let messages = recent_messages(12);
    let store = FakeMessageStore::with_messages(messages.clone());

    let deleted = clear_recent(
        &store,
        text_channel(),
        Some(Permissions::ADMINISTRATOR),
        5,
        NOW,
    )
    .await
    .unwrap();

    assert_eq!(deleted, 5);
    assert_eq!(store.remaining(), messages[5..].to_vec());
    assert_eq!(store.bulk_calls(), vec![messages[..5].to_vec()]);
}

#[test_case(None ; "permissions unknown")]
#[test_case(Some(Permissions::SEND_MESSAGES | Permissions::CONNECT) ; "regular member")]
#[tokio::test]
async fn non_admin_clear_deletes_nothing(permissions: Option<Permissions>) {
    let store = FakeMessageStore::with_messages(recent_messages(5));

    let result = clear_recent(&store, text_channel(), permissions, 5, NOW).await;

    assert_matches!(&result, Err(AdminError::PermissionDenied));
    assert_eq!(result.unwrap_err().kind(), ErrorKind::Permission);
    assert_eq!(store.remaining().len(), 5);
    assert!(store.bulk_calls().is_empty());
    assert!(store.single_calls().is_empty());
}

#[tokio::test]
async fn default_amount_clears_ten() {
    let store = FakeMessageStore::with_messages(recent_messages(30));

    let deleted = clear_recent(
        &store,
        text_channel(),
        Some(Permissions::MANAGE_MESSAGES),
        DEFAULT_CLEAR_AMOUNT,
        NOW,
    )
    .await
    .unwrap();

    assert_eq!(deleted, 10);
    assert_eq!(store.remaining().len(), 20);
}
