//! Integration tests for room actors and the registry.
//!
//! These run real actor tasks on a paused clock so the guess timeout and
//! round pause fire deterministically.

use std::time::Duration;

use konpira_protocol::{Move, Phase, PlayerId, RoomId, ServerMessage};
use konpira_room::{PlayerRequest, RoomConfig, RoomError, RoomRegistry};
use konpira_session::OutboundSender;
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

fn pid(id: &str) -> PlayerId {
    PlayerId::new(id)
}

fn rid(id: &str) -> RoomId {
    RoomId::new(id)
}

fn registry() -> RoomRegistry {
    RoomRegistry::new(RoomConfig {
        initial_box_on_table: Some(true),
        ..RoomConfig::default()
    })
}

fn channel() -> (OutboundSender, mpsc::UnboundedReceiver<ServerMessage>) {
    mpsc::unbounded_channel()
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

/// Joins "a" and "b" to room "r1" and returns their receivers, drained.
async fn two_player_room(
    reg: &mut RoomRegistry,
) -> (
    mpsc::UnboundedReceiver<ServerMessage>,
    mpsc::UnboundedReceiver<ServerMessage>,
) {
    let (tx_a, mut rx_a) = channel();
    let (tx_b, mut rx_b) = channel();
    reg.join(&rid("r1"), pid("a"), tx_a).await.unwrap();
    reg.join(&rid("r1"), pid("b"), tx_b).await.unwrap();
    drain(&mut rx_a);
    drain(&mut rx_b);
    (rx_a, rx_b)
}

// =========================================================================
// Registry
// =========================================================================

#[tokio::test]
async fn test_join_creates_room_lazily() {
    let mut reg = registry();
    assert_eq!(reg.room_count(), 0);

    let (tx, mut rx) = channel();
    let count = reg.join(&rid("kitchen"), pid("a"), tx).await.unwrap();

    assert_eq!(count, 1);
    assert!(reg.contains(&rid("kitchen")));
    assert_eq!(reg.room_ids(), vec![rid("kitchen")]);
    match rx.recv().await.unwrap() {
        ServerMessage::RoomJoined { player_count, .. } => assert_eq!(player_count, 1),
        other => panic!("expected RoomJoined, got {other:?}"),
    }
}

#[tokio::test]
async fn test_same_id_reaches_the_same_room() {
    let mut reg = registry();
    let first = reg.get_or_create(&rid("r1"));
    let second = reg.get_or_create(&rid("r1"));
    assert_eq!(first.room_id(), second.room_id());
    assert_eq!(reg.room_count(), 1);
}

#[tokio::test]
async fn test_second_join_starts_the_game_for_both() {
    let mut reg = registry();
    let (tx_a, mut rx_a) = channel();
    let (tx_b, mut rx_b) = channel();
    reg.join(&rid("r1"), pid("a"), tx_a).await.unwrap();
    assert_eq!(reg.join(&rid("r1"), pid("b"), tx_b).await.unwrap(), 2);

    let start = ServerMessage::GameStart { room_id: rid("r1") };
    assert!(drain(&mut rx_a).contains(&start));
    assert!(drain(&mut rx_b).contains(&start));

    let info = reg.room_info(&rid("r1")).await.unwrap();
    assert_eq!(info.phase, Phase::Action);
    assert_eq!(info.player_count, 2);
}

#[tokio::test]
async fn test_full_room_rejects_and_survives() {
    let mut reg = registry();
    two_player_room(&mut reg).await;

    let (tx_c, _rx_c) = channel();
    let err = reg.join(&rid("r1"), pid("c"), tx_c).await.unwrap_err();
    assert!(matches!(err, RoomError::RoomFull(_)));
    assert!(reg.contains(&rid("r1")));
}

#[tokio::test]
async fn test_room_is_destroyed_when_empty() {
    let mut reg = registry();
    two_player_room(&mut reg).await;
    let handle = reg.get(&rid("r1")).unwrap();

    assert_eq!(reg.leave(&rid("r1"), pid("a")).await.unwrap(), 1);
    assert!(reg.contains(&rid("r1")));
    assert_eq!(reg.leave(&rid("r1"), pid("b")).await.unwrap(), 0);
    assert!(!reg.contains(&rid("r1")));

    // Give the actor a moment to process Shutdown.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(matches!(handle.info().await, Err(RoomError::Unavailable(_))));
}

#[tokio::test]
async fn test_leave_unknown_room() {
    let mut reg = registry();
    assert!(matches!(
        reg.leave(&rid("nowhere"), pid("a")).await,
        Err(RoomError::NotFound(_))
    ));
}

// =========================================================================
// Actor behaviour
// =========================================================================

#[tokio::test]
async fn test_request_is_answered_and_broadcast() {
    let mut reg = registry();
    let (mut rx_a, mut rx_b) = two_player_room(&mut reg).await;
    let room = reg.get(&rid("r1")).unwrap();

    let err = room
        .request(pid("b"), PlayerRequest::Action(Move::TouchBox))
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::NotYourTurn));
    assert!(drain(&mut rx_a).is_empty(), "rejections are never broadcast");

    let ack = room
        .request(pid("a"), PlayerRequest::Action(Move::TouchBox))
        .await
        .unwrap();
    assert!(ack.detached.is_empty());
    assert_eq!(ack.player_count, 2);

    for rx in [&mut rx_a, &mut rx_b] {
        let phases: Vec<Phase> = drain(rx)
            .into_iter()
            .filter_map(|m| match m {
                ServerMessage::GameState { state } => Some(state.phase),
                _ => None,
            })
            .collect();
        assert_eq!(phases, vec![Phase::Guessing]);
    }
}

#[tokio::test(start_paused = true)]
async fn test_guess_timeout_fires_and_round_resumes() {
    let mut reg = registry();
    let (_rx_a, _rx_b) = two_player_room(&mut reg).await;
    let room = reg.get(&rid("r1")).unwrap();

    room.request(pid("a"), PlayerRequest::Action(Move::TouchBox))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(3500)).await;
    let info = room.info().await.unwrap();
    assert_eq!(info.phase, Phase::Validation);
    assert_eq!(info.state.players[1].drink_level, 1);
    assert_eq!(info.state.players[0].drink_level, 0);
    assert_eq!(info.state.round_number, 2);

    tokio::time::sleep(Duration::from_millis(2000)).await;
    let info = room.info().await.unwrap();
    assert_eq!(info.phase, Phase::Action);
    assert_eq!(info.state.current_player_index, 1);
}

#[tokio::test(start_paused = true)]
async fn test_guess_cancels_the_timeout() {
    let mut reg = registry();
    let (_rx_a, _rx_b) = two_player_room(&mut reg).await;
    let room = reg.get(&rid("r1")).unwrap();

    room.request(pid("a"), PlayerRequest::Action(Move::TouchBox))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    room.request(pid("b"), PlayerRequest::Guess(Move::TouchBox))
        .await
        .unwrap();

    // Past the original deadline and the round pause.
    tokio::time::sleep(Duration::from_millis(4000)).await;
    let info = room.info().await.unwrap();
    assert_eq!(info.phase, Phase::Action);
    assert_eq!(info.state.round_number, 2);
    assert_eq!(info.state.players[1].drink_level, 0);
}

#[tokio::test(start_paused = true)]
async fn test_countdown_reaches_clients() {
    let mut reg = registry();
    let (_rx_a, mut rx_b) = two_player_room(&mut reg).await;
    let room = reg.get(&rid("r1")).unwrap();

    room.request(pid("a"), PlayerRequest::Action(Move::TouchBox))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let countdown: Vec<u64> = drain(&mut rx_b)
        .into_iter()
        .filter_map(|m| match m {
            ServerMessage::TimerUpdate {
                time_left,
                phase: Phase::Guessing,
            } => Some(time_left),
            _ => None,
        })
        .collect();
    assert_eq!(countdown, vec![3, 2, 1]);
}

#[tokio::test]
async fn test_disconnect_mid_game_notifies_survivor() {
    let mut reg = registry();
    let (_rx_a, mut rx_b) = two_player_room(&mut reg).await;

    reg.leave(&rid("r1"), pid("a")).await.unwrap();

    let msgs = drain(&mut rx_b);
    assert!(msgs.contains(&ServerMessage::notice("a left the game")));
    let last_state = msgs
        .iter()
        .rev()
        .find_map(|m| match m {
            ServerMessage::GameState { state } => Some(state),
            _ => None,
        })
        .unwrap();
    assert_eq!(last_state.phase, Phase::GameOver);
    assert_eq!(last_state.winner, Some(pid("b")));
}

#[tokio::test]
async fn test_give_up_then_kick_is_rejected() {
    let mut reg = registry();
    let (_rx_a, _rx_b) = two_player_room(&mut reg).await;
    let room = reg.get(&rid("r1")).unwrap();

    room.request(pid("a"), PlayerRequest::GiveUp).await.unwrap();
    let err = room
        .request(pid("b"), PlayerRequest::Kick { target: pid("a") })
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::WrongPhase { .. }));
}

#[tokio::test]
async fn test_shutdown_makes_handle_unavailable() {
    let mut reg = registry();
    let handle = reg.get_or_create(&rid("r1"));
    reg.destroy(&rid("r1")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    let (tx, _rx) = channel();
    assert!(matches!(
        handle.join(pid("a"), tx).await,
        Err(RoomError::Unavailable(_))
    ));
    assert_eq!(reg.room_count(), 0);
}
