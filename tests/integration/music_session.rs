use assert_matches::assert_matches;
use jukebox::commands::music::utils::music_manager::{
    MusicError, MusicServices, MusicSession, MusicSessions,
};
use jukebox::commands::music::utils::playback::{PlayOutcome, PlayerState};
use jukebox::commands::music::utils::voice_manager::VoiceManager;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

use crate::common::fixtures::{guild_id, other_requester, requester, song, user_id, voice_channel};
use crate::common::mocks::{
    FakeConnection, FakeStreamer, FakeTransport, MockSearcher, RecordingReplies, echo_searcher,
};
use crate::common::settle;
use crate::test_utils;

struct Harness {
    session: Arc<MusicSession>,
    transport: Arc<FakeTransport>,
    streamer: Arc<FakeStreamer>,
    replies: Arc<RecordingReplies>,
}

impl Harness {
    fn services(searcher: MockSearcher, streamer: Arc<FakeStreamer>) -> MusicServices {
        MusicServices::new(
            Arc::new(searcher),
            streamer,
            Arc::new(VoiceManager::new(Duration::from_secs(5))),
            0.1,
        )
    }

    /// A session that has not been initialized yet
    fn uninitialized(searcher: MockSearcher) -> Self {
        test_utils::init();
        let streamer = Arc::new(FakeStreamer::default());
        let transport = Arc::new(FakeTransport::default());
        transport.place(user_id(), voice_channel());

        Self {
            session: MusicSession::new(guild_id(), &Self::services(searcher, streamer.clone())),
            transport,
            streamer,
            replies: Arc::new(RecordingReplies::default()),
        }
    }

    async fn initialized(searcher: MockSearcher) -> Self {
        let harness = Self::uninitialized(searcher);
        harness.session.initialize(harness.transport.clone()).await;
        harness
    }

    async fn add(&self, query: &str) -> Result<String, MusicError> {
        let result = self
            .session
            .add_song(query, requester(), self.replies.clone())
            .await;
        settle().await;
        result
    }

    fn connection(&self) -> Arc<FakeConnection> {
        self.transport.connection(0)
    }

    async fn current_title(&self) -> Option<String> {
        self.session
            .queue_snapshot()
            .await
            .current
            .map(|request| request.title().to_string())
    }
}

#[tokio::test]
async fn operations_fail_before_initialize() {
    let mut searcher = MockSearcher::new();
    searcher.expect_search().times(0);
    let harness = Harness::uninitialized(searcher);

    assert_matches!(harness.add("song A").await, Err(MusicError::NotInitialized));
    assert_matches!(harness.session.skip().await, Err(MusicError::NotInitialized));
    assert_matches!(
        harness.session.play(harness.replies.clone()).await,
        Err(MusicError::NotInitialized)
    );
    assert!(!harness.session.is_initialized().await);
    assert!(harness.transport.joins().is_empty());
}

#[tokio::test]
async fn first_song_joins_and_starts_playing() {
    let harness = Harness::initialized(echo_searcher()).await;

    let title = harness.add("song A").await.unwrap();

    assert_eq!(title, "song A");
    let snapshot = harness.session.queue_snapshot().await;
    assert_eq!(snapshot.current.map(|r| r.requested_by), Some(requester()));
    assert!(snapshot.upcoming.is_empty());
    assert_eq!(harness.transport.joins(), vec![(guild_id(), voice_channel())]);
    assert_eq!(harness.connection().players().len(), 1);
    assert_eq!(harness.connection().player(0).url(), song("song A").url);
    assert_eq!(harness.replies.sent(), vec!["Now playing: song A"]);
}

#[tokio::test]
async fn song_added_while_playing_waits_its_turn() {
    let harness = Harness::initialized(echo_searcher()).await;
    harness.add("song A").await.unwrap();

    let title = harness
        .session
        .add_song("song B", other_requester(), harness.replies.clone())
        .await
        .unwrap();
    settle().await;

    assert_eq!(title, "song B");
    let snapshot = harness.session.queue_snapshot().await;
    assert_eq!(snapshot.upcoming.len(), 1);
    assert_eq!(snapshot.upcoming[0].requested_by, other_requester());
    assert_eq!(harness.connection().players().len(), 1);
    assert_eq!(harness.streamer.opened(), vec![song("song A").url]);
    assert_eq!(harness.replies.sent(), vec!["Now playing: song A"]);
}

#[tokio::test]
async fn finished_song_advances_to_the_next() {
    let harness = Harness::initialized(echo_searcher()).await;
    harness.add("song A").await.unwrap();
    harness.add("song B").await.unwrap();

    harness.connection().player(0).finish();
    settle().await;

    assert_eq!(harness.current_title().await.as_deref(), Some("song B"));
    assert_eq!(harness.session.queue_snapshot().await.played, 1);
    assert_eq!(harness.connection().players().len(), 2);
    assert_eq!(
        harness.replies.sent(),
        vec!["Now playing: song A", "Now playing: song B"]
    );
    // One connection serves the whole queue
    assert_eq!(harness.transport.joins().len(), 1);
}

#[tokio::test]
async fn song_added_before_the_idle_event_arrives_plays_next() {
    let harness = Harness::initialized(echo_searcher()).await;
    harness.add("song A").await.unwrap();

    // No settle: the idle event is still queued when the next song comes in
    harness.connection().player(0).finish();
    harness.add("song B").await.unwrap();
    settle().await;

    assert_eq!(
        harness.replies.sent(),
        vec!["Now playing: song A", "Now playing: song B"]
    );
    assert_eq!(harness.connection().players().len(), 2);
    assert_eq!(harness.connection().player(1).url(), song("song B").url);
    assert_eq!(harness.current_title().await.as_deref(), Some("song B"));
    assert_eq!(harness.session.queue_snapshot().await.played, 1);
}

#[tokio::test]
async fn failed_advance_is_announced_and_retried_on_next_request() {
    let harness = Harness::initialized(echo_searcher()).await;
    harness.add("song A").await.unwrap();
    harness.add("song B").await.unwrap();
    harness.streamer.fail_on(&song("song B").url);

    harness.connection().player(0).finish();
    settle().await;

    assert_eq!(
        harness.replies.sent(),
        vec![
            "Now playing: song A",
            "❌ Something went wrong, please try again"
        ]
    );
    assert_eq!(harness.connection().players().len(), 1);
    assert_eq!(harness.current_title().await.as_deref(), Some("song B"));

    // Nothing retries on its own
    settle().await;
    assert_eq!(harness.connection().players().len(), 1);

    harness.streamer.restore(&song("song B").url);
    harness.add("song C").await.unwrap();

    assert_eq!(harness.connection().players().len(), 2);
    assert_eq!(harness.connection().player(1).url(), song("song B").url);
    let snapshot = harness.session.queue_snapshot().await;
    assert_eq!(snapshot.current.map(|r| r.title().to_string()).as_deref(), Some("song B"));
    assert_eq!(snapshot.upcoming.len(), 1);
    assert_eq!(
        harness.replies.sent().last().map(String::as_str),
        Some("Now playing: song B")
    );
}

#[tokio::test]
async fn queue_goes_dormant_after_the_last_song() {
    let harness = Harness::initialized(echo_searcher()).await;
    harness.add("song A").await.unwrap();

    harness.connection().player(0).finish();
    settle().await;

    assert_eq!(harness.current_title().await, None);
    assert_eq!(harness.connection().players().len(), 1);

    // A new request wakes the queue up again
    harness.add("song C").await.unwrap();
    assert_eq!(harness.connection().players().len(), 2);
    assert_eq!(harness.current_title().await.as_deref(), Some("song C"));
    assert_eq!(
        harness.replies.sent(),
        vec!["Now playing: song A", "Now playing: song C"]
    );
}

#[tokio::test]
async fn skipping_the_only_song_plays_nothing_else() {
    let harness = Harness::initialized(echo_searcher()).await;
    harness.add("song A").await.unwrap();

    assert!(harness.session.skip().await.unwrap());
    settle().await;

    assert_eq!(
        harness.connection().player(0).current_state(),
        PlayerState::Idle
    );
    assert_eq!(harness.connection().players().len(), 1);
    assert_eq!(harness.streamer.opened().len(), 1);
    assert_eq!(harness.current_title().await, None);
    assert!(!harness.session.skip().await.unwrap());
}

#[tokio::test]
async fn skip_moves_to_the_next_song() {
    let harness = Harness::initialized(echo_searcher()).await;
    harness.add("song A").await.unwrap();
    harness.add("song B").await.unwrap();

    assert!(harness.session.skip().await.unwrap());
    settle().await;

    assert_eq!(harness.current_title().await.as_deref(), Some("song B"));
    assert_eq!(harness.connection().players().len(), 2);
    assert_eq!(
        harness.connection().player(1).current_state(),
        PlayerState::Playing
    );
}

#[tokio::test]
async fn idle_events_from_replaced_players_are_ignored() {
    let harness = Harness::initialized(echo_searcher()).await;
    harness.add("song A").await.unwrap();
    harness.add("song B").await.unwrap();
    harness.add("song C").await.unwrap();
    harness.session.skip().await.unwrap();
    settle().await;

    // The first player reports idle a second time
    harness.connection().player(0).finish();
    settle().await;

    assert_eq!(harness.current_title().await.as_deref(), Some("song B"));
    assert_eq!(harness.connection().players().len(), 2);
}

#[tokio::test]
async fn not_found_leaves_the_queue_untouched() {
    let mut searcher = MockSearcher::new();
    searcher.expect_search().returning(|_| Ok(vec![]));
    let harness = Harness::initialized(searcher).await;

    let result = harness.add("zzzzqqqq").await;

    assert_matches!(result, Err(MusicError::NotFound(_)));
    assert_eq!(harness.current_title().await, None);
    assert!(harness.transport.joins().is_empty());
    assert!(harness.replies.sent().is_empty());
}

#[tokio::test]
async fn requester_outside_voice_gets_an_error() {
    let harness = Harness::initialized(echo_searcher()).await;

    let result = harness
        .session
        .add_song("song A", other_requester(), harness.replies.clone())
        .await;

    assert_matches!(result, Err(MusicError::NoVoiceChannel));
    assert!(harness.transport.joins().is_empty());
    assert!(harness.replies.sent().is_empty());
}

#[tokio::test]
async fn stream_failure_aborts_the_play_attempt() {
    let harness = Harness::initialized(echo_searcher()).await;
    harness.streamer.fail_on(&song("song A").url);

    let result = harness.add("song A").await;

    assert_matches!(result, Err(MusicError::StreamFailure(_)));
    assert!(harness.transport.joins().is_empty());
    assert!(harness.replies.sent().is_empty());
}

#[tokio::test]
async fn pause_and_resume_control_the_player() {
    let harness = Harness::initialized(echo_searcher()).await;
    assert!(!harness.session.pause().await.unwrap());
    harness.add("song A").await.unwrap();
    let player = harness.connection().player(0);

    assert!(harness.session.pause().await.unwrap());
    assert_eq!(player.current_state(), PlayerState::Paused);
    assert!(!harness.session.pause().await.unwrap());

    assert!(harness.session.resume().await.unwrap());
    assert_eq!(player.current_state(), PlayerState::Playing);
    assert!(!harness.session.resume().await.unwrap());
}

#[tokio::test]
async fn adding_a_song_resumes_a_paused_player() {
    let harness = Harness::initialized(echo_searcher()).await;
    harness.add("song A").await.unwrap();
    harness.session.pause().await.unwrap();

    harness.add("song B").await.unwrap();

    assert_eq!(
        harness.connection().player(0).current_state(),
        PlayerState::Playing
    );
    assert_eq!(harness.connection().players().len(), 1);
}

#[tokio::test]
async fn auto_paused_player_is_resumed_by_attempt_play() {
    let harness = Harness::initialized(echo_searcher()).await;
    harness.add("song A").await.unwrap();
    harness
        .connection()
        .player(0)
        .set_state(PlayerState::AutoPaused);

    let outcome = harness
        .session
        .attempt_play(harness.replies.clone())
        .await
        .unwrap();

    assert_eq!(outcome, PlayOutcome::Resumed);
    assert_eq!(
        harness.connection().player(0).current_state(),
        PlayerState::Playing
    );
}

#[tokio::test]
async fn buffering_player_is_left_alone() {
    let harness = Harness::initialized(echo_searcher()).await;
    harness.add("song A").await.unwrap();
    harness
        .connection()
        .player(0)
        .set_state(PlayerState::Buffering);

    let outcome = harness
        .session
        .attempt_play(harness.replies.clone())
        .await
        .unwrap();

    assert_eq!(outcome, PlayOutcome::Buffering);
    assert_eq!(harness.connection().players().len(), 1);
}

#[tokio::test]
async fn play_restarts_the_current_entry() {
    let harness = Harness::initialized(echo_searcher()).await;
    harness.add("song A").await.unwrap();

    let outcome = harness.session.play(harness.replies.clone()).await.unwrap();
    settle().await;

    assert_eq!(outcome, PlayOutcome::Started("song A".to_string()));
    assert_eq!(harness.connection().players().len(), 2);
    assert_eq!(
        harness.connection().player(0).current_state(),
        PlayerState::Idle
    );
    // The replaced player's idle event must not advance the queue
    assert_eq!(harness.current_title().await.as_deref(), Some("song A"));
}

#[tokio::test]
async fn volume_applies_to_current_and_later_players() {
    let harness = Harness::initialized(echo_searcher()).await;
    harness.add("song A").await.unwrap();
    harness.add("song B").await.unwrap();
    assert_eq!(harness.connection().player(0).current_volume(), 0.1);

    harness.session.set_volume(50).await.unwrap();
    assert_eq!(harness.connection().player(0).current_volume(), 0.5);

    harness.connection().player(0).finish();
    settle().await;
    assert_eq!(harness.connection().player(1).current_volume(), 0.5);
    assert_eq!(harness.session.queue_snapshot().await.volume, 50);

    assert_matches!(
        harness.session.set_volume(101).await,
        Err(MusicError::InvalidVolume(101))
    );
}

#[tokio::test]
async fn leave_resets_the_session_and_disconnects() {
    let harness = Harness::initialized(echo_searcher()).await;
    harness.add("song A").await.unwrap();
    harness.add("song B").await.unwrap();

    harness.session.leave().await.unwrap();
    settle().await;

    assert_eq!(harness.connection().destroy_count(), 1);
    assert_eq!(harness.current_title().await, None);
    // Stopping the player on the way out must not start song B
    assert_eq!(harness.connection().players().len(), 1);
    assert_matches!(harness.session.leave().await, Err(MusicError::NotConnected));
}

#[tokio::test]
async fn sessions_are_created_once_per_guild() {
    test_utils::init();
    let transport = Arc::new(FakeTransport::default());
    let services = Harness::services(echo_searcher(), Arc::new(FakeStreamer::default()));
    let sessions = MusicSessions::new(services, transport);

    assert!(sessions.get(guild_id()).is_none());
    let first = sessions.session(guild_id()).await;
    let second = sessions.session(guild_id()).await;

    assert!(Arc::ptr_eq(&first, &second));
    assert!(first.is_initialized().await);
    assert_eq!(first.guild_id(), guild_id());
}
