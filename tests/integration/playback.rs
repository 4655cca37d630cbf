use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use mockall::predicate::eq;
use pretty_assertions::assert_eq;
use rstest::*;

use jukebox::ErrorKind;
use jukebox::commands::music::utils::music_manager::{JoinOutcome, MusicError};
use jukebox::commands::music::utils::voice_driver::StreamEnd;

use crate::common::fixtures::{
    guild, other_guild, other_voice_channel, sample_track, voice_channel,
};
use crate::common::mocks::{GatedResolver, MockResolver};
use crate::common::{test_data, test_data_with, wait_until_idle};
use crate::test_utils;

/// Resolves any query to a track named after it.
#[fixture]
fn resolver() -> MockResolver {
    test_utils::init();
    let mut resolver = MockResolver::new();
    resolver
        .expect_resolve()
        .returning(|query| Ok(sample_track(query)));
    resolver
}

#[rstest]
#[tokio::test]
async fn play_joins_and_streams_the_resolved_url(resolver: MockResolver) {
    let (data, driver) = test_data(resolver, true);

    let outcome = data
        .playback
        .play(guild(), Some(voice_channel()), "lofi")
        .await
        .unwrap();

    assert_eq!(outcome.metadata.title, "lofi");
    assert!(!outcome.replaced);
    assert!(data.sessions.is_connected(guild()).await);

    assert_eq!(driver.stream_count(), 1);
    let request = driver.request(0);
    assert_eq!(request.source_url, "https://rr1.googlevideo.com/lofi");
    assert!(request.command().get_args().any(|arg| arg == "-reconnect"));
}

#[rstest]
#[tokio::test]
async fn play_while_playing_stops_the_prior_stream(resolver: MockResolver) {
    let (data, driver) = test_data(resolver, true);

    data.playback
        .play(guild(), Some(voice_channel()), "first")
        .await
        .unwrap();
    let second = data
        .playback
        .play(guild(), Some(voice_channel()), "second")
        .await
        .unwrap();

    assert!(second.replaced);
    assert!(driver.stream(0).is_stopped());
    assert!(!driver.stream(1).is_stopped());
    assert_matches!(data.playback.now_playing(guild()).await, Some((track, false)) if track.title == "second");
}

#[rstest]
#[tokio::test]
async fn pause_then_resume_keeps_the_same_stream(resolver: MockResolver) {
    let (data, driver) = test_data(resolver, true);
    data.playback
        .play(guild(), Some(voice_channel()), "song")
        .await
        .unwrap();

    data.playback.pause(guild()).await.unwrap();
    assert!(driver.stream(0).is_paused());
    assert_matches!(data.playback.now_playing(guild()).await, Some((_, true)));

    data.playback.resume(guild()).await.unwrap();
    assert!(!driver.stream(0).is_paused());
    assert_eq!(driver.stream_count(), 1);
    assert_eq!(data.playback.resume(guild()).await, Err(MusicError::NotPaused));
}

#[rstest]
#[tokio::test]
async fn stop_when_idle_is_a_no_op(resolver: MockResolver) {
    let (data, _driver) = test_data(resolver, true);
    data.sessions.join(guild(), Some(voice_channel())).await.unwrap();

    assert_eq!(data.playback.stop(guild()).await, Ok(None));
    assert_eq!(data.playback.pause(guild()).await, Err(MusicError::NothingPlaying));
    assert!(data.sessions.is_connected(guild()).await);
}

#[rstest]
#[tokio::test]
async fn stale_end_signal_does_not_clear_the_new_stream(resolver: MockResolver) {
    let (data, driver) = test_data(resolver, true);
    data.playback
        .play(guild(), Some(voice_channel()), "old")
        .await
        .unwrap();
    data.playback
        .play(guild(), Some(voice_channel()), "new")
        .await
        .unwrap();

    driver.finish(0, StreamEnd::Finished);
    tokio::task::yield_now().await;
    assert_matches!(data.playback.now_playing(guild()).await, Some((track, _)) if track.title == "new");

    driver.finish(1, StreamEnd::Failed("ffmpeg exited".into()));
    wait_until_idle(&data, guild()).await;
    assert!(data.sessions.is_connected(guild()).await);
}

#[tokio::test]
async fn unresolvable_query_leaves_no_connection() {
    test_utils::init();
    let mut resolver = MockResolver::new();
    resolver
        .expect_resolve()
        .with(eq("definitely not a song"))
        .times(1)
        .returning(|_| Err(MusicError::AudioSourceError("No results found".into())));
    let (data, driver) = test_data(resolver, true);

    let result = data
        .playback
        .play(guild(), Some(voice_channel()), "definitely not a song")
        .await;

    assert_matches!(&result, Err(err) if err.kind() == ErrorKind::Resolution);
    assert!(!data.sessions.is_connected(guild()).await);
    assert_eq!(driver.connects().len(), 0);
}

#[rstest]
#[tokio::test]
async fn without_auto_join_play_needs_a_connection(mut resolver: MockResolver) {
    resolver.checkpoint();
    resolver.expect_resolve().never();
    let (data, _driver) = test_data(resolver, false);

    let result = data
        .playback
        .play(guild(), Some(voice_channel()), "song")
        .await;

    assert_eq!(result, Err(MusicError::NotConnected));
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn leave_waits_for_an_in_flight_play() {
    test_utils::init();
    let resolver = Arc::new(GatedResolver::new());
    let (data, driver) = test_data_with(resolver.clone(), true);
    let data = Arc::new(data);
    data.sessions.join(guild(), Some(voice_channel())).await.unwrap();

    let play = tokio::spawn({
        let data = Arc::clone(&data);
        async move { data.playback.play(guild(), Some(voice_channel()), "song").await }
    });
    resolver.wait_entered().await;

    let leave = tokio::spawn({
        let data = Arc::clone(&data);
        async move { data.sessions.leave(guild()).await }
    });
    settle().await;
    assert!(!leave.is_finished());

    // The busy guild does not hold up anyone else
    let other = tokio::time::timeout(
        Duration::from_secs(1),
        data.sessions.join(other_guild(), Some(other_voice_channel())),
    )
    .await;
    assert_matches!(other, Ok(Ok(JoinOutcome::Joined(_))));
    assert!(!leave.is_finished());

    resolver.release(1);
    assert!(play.await.unwrap().is_ok());
    assert_eq!(leave.await.unwrap(), Ok(voice_channel()));

    assert!(!data.sessions.is_connected(guild()).await);
    assert!(data.sessions.is_connected(other_guild()).await);
    assert!(driver.stream(0).is_stopped());
    assert_eq!(driver.live_streams(), 0);
}

#[tokio::test]
async fn concurrent_plays_leave_exactly_one_stream() {
    test_utils::init();
    let resolver = Arc::new(GatedResolver::new());
    let (data, driver) = test_data_with(resolver.clone(), true);
    let data = Arc::new(data);

    let first = tokio::spawn({
        let data = Arc::clone(&data);
        async move { data.playback.play(guild(), Some(voice_channel()), "first").await }
    });
    resolver.wait_entered().await;

    let second = tokio::spawn({
        let data = Arc::clone(&data);
        async move { data.playback.play(guild(), Some(voice_channel()), "second").await }
    });
    settle().await;
    assert!(!second.is_finished());

    resolver.release(2);
    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert!(!first.replaced);
    assert!(second.replaced);
    assert_eq!(driver.connects().len(), 1);
    assert_eq!(driver.stream_count(), 2);
    assert!(driver.stream(0).is_stopped());
    assert_eq!(driver.live_streams(), 1);
    assert_matches!(data.playback.now_playing(guild()).await, Some((track, false)) if track.title == "second");
}
