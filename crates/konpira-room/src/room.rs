//! The room state machine.
//!
//! [`Room`] owns one room's participants and [`GameState`] and applies
//! every rule of the game. It is synchronous and does no I/O: each
//! operation mutates the state and returns the [`Effect`]s the caller (the
//! room actor) must carry out, such as messages to send and timers to arm.
//! That keeps the whole game testable without a runtime.
//!
//! ```text
//! waiting ─→ action ─→ guessing ─→ validation ─┬→ action (next round)
//!              │                               └→ postGame
//!              └→ postGame (action penalty fills a bottle)
//!
//! postGame ─┬→ waiting ─→ action   (both continue, after restart_delay)
//!           ├→ gameOver            (someone chose end)
//!           └→ waiting             (winner kicked the loser)
//!
//! in play / postGame ─→ gameOver   (give-up, or a player left)
//! gameOver ─→ waiting / action     (restartGame, or a newcomer joins)
//! ```

use std::time::Duration;

use konpira_protocol::{
    Decision, GameState, Move, Phase, PlayerDecision, PlayerId, PlayerState, PostGameDecision,
    PostGameState, Recipient, RoomId, ServerMessage,
};
use rand::Rng;
use tracing::{debug, info};

use crate::rules::{self, Verdict};
use crate::{MAX_PLAYERS, RoomConfig, RoomError};

// ---------------------------------------------------------------------------
// Requests, timers, effects
// ---------------------------------------------------------------------------

/// Something a participant asks of their room after joining.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerRequest {
    Action(Move),
    Guess(Move),
    GiveUp,
    Restart,
    Decision(Decision),
    Kick { target: PlayerId },
}

/// Identifies the exact game moment a timer was armed in.
///
/// A timer whose stamp no longer matches [`Room::stamp`] is stale and does
/// nothing when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    /// Bumped every time the `GameState` is replaced.
    pub generation: u64,
    pub round: u32,
    pub phase: Phase,
}

/// What a timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// The guesser ran out of time.
    GuessTimeout,
    /// Broadcast a `timerUpdate` and re-arm until the count runs out.
    Countdown { time_left: u64 },
    /// The pause after a validated round is over.
    RoundPause,
    /// A rematch (or restart) may begin.
    Restart,
}

/// A scheduled callback into the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub kind: TimerKind,
    pub stamp: Stamp,
}

/// An instruction from the state machine to its driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Deliver a message to the participants selected by the recipient.
    Send(Recipient, ServerMessage),
    /// Arm a timer.
    Schedule { timer: Timer, after: Duration },
    /// Disarm every pending timer.
    CancelTimers,
    /// Stop delivering to a player who is no longer in the room.
    Detach(PlayerId),
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// One room's authoritative game.
#[derive(Debug)]
pub struct Room {
    room_id: RoomId,
    config: RoomConfig,
    /// Join order; `state.players` always mirrors it.
    participants: Vec<PlayerId>,
    state: GameState,
    generation: u64,
}

impl Room {
    /// Creates an empty room in the `waiting` phase.
    pub fn new(room_id: RoomId, config: RoomConfig) -> Self {
        let state = GameState::new(&[], fresh_box(&config));
        Self {
            room_id,
            config,
            participants: Vec::new(),
            state,
            generation: 0,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// The current game state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Participants in join order.
    pub fn participants(&self) -> &[PlayerId] {
        &self.participants
    }

    pub fn player_count(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// How many times the `GameState` has been replaced.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The stamp a timer armed right now would carry.
    pub fn stamp(&self) -> Stamp {
        Stamp {
            generation: self.generation,
            round: self.state.current_round,
            phase: self.state.phase,
        }
    }

    // -- membership ---------------------------------------------------------

    /// Seats a player.
    ///
    /// The joiner gets `roomJoined`; everyone gets the new state. The second
    /// arrival starts the match. Joining a finished room first clears the
    /// old game away.
    ///
    /// # Errors
    /// [`RoomError::AlreadyInRoom`] or [`RoomError::RoomFull`].
    pub fn join(&mut self, player_id: PlayerId) -> Result<Vec<Effect>, RoomError> {
        if self.participants.contains(&player_id) {
            return Err(RoomError::AlreadyInRoom(player_id, self.room_id.clone()));
        }
        if self.participants.len() >= MAX_PLAYERS {
            return Err(RoomError::RoomFull(self.room_id.clone()));
        }

        let mut out = Vec::new();
        if self.state.phase == Phase::GameOver {
            self.reset(&mut out);
        }

        self.participants.push(player_id.clone());
        self.state.players.push(PlayerState::new(player_id.clone()));
        info!(
            room_id = %self.room_id,
            %player_id,
            players = self.participants.len(),
            "player joined"
        );

        out.push(Effect::Send(
            Recipient::Player(player_id.clone()),
            ServerMessage::RoomJoined {
                room_id: self.room_id.clone(),
                player_id,
                player_count: self.participants.len(),
            },
        ));

        if self.participants.len() == MAX_PLAYERS && self.state.phase == Phase::Waiting {
            self.start_game(&mut out);
        } else {
            self.broadcast_state(&mut out);
        }
        Ok(out)
    }

    /// Removes a player who disconnected.
    ///
    /// A match in progress (or being negotiated) ends in the survivor's
    /// favour. The last one out leaves an empty `waiting` room behind.
    ///
    /// # Errors
    /// [`RoomError::NotInRoom`].
    pub fn leave(&mut self, player_id: &PlayerId) -> Result<Vec<Effect>, RoomError> {
        let idx = self.index_of(player_id)?;
        self.participants.remove(idx);
        self.state.players.remove(idx);
        info!(
            room_id = %self.room_id,
            %player_id,
            phase = %self.state.phase,
            players = self.participants.len(),
            "player left"
        );

        let mut out = vec![Effect::CancelTimers];
        if self.participants.is_empty() {
            self.reset(&mut out);
            return Ok(out);
        }

        self.state.current_player_index = 0;
        let reason = format!("{player_id} left the game");
        if self.state.phase.is_in_play() || self.state.phase == Phase::PostGame {
            let survivor = self.participants.first().cloned();
            self.finish_game(survivor, reason, &mut out);
        } else {
            out.push(Effect::Send(Recipient::All, ServerMessage::notice(reason)));
            self.broadcast_state(&mut out);
        }
        Ok(out)
    }

    // -- requests -----------------------------------------------------------

    /// Routes a participant's request to the matching operation.
    pub fn handle(
        &mut self,
        player_id: &PlayerId,
        request: PlayerRequest,
    ) -> Result<Vec<Effect>, RoomError> {
        match request {
            PlayerRequest::Action(action) => self.process_action(player_id, action),
            PlayerRequest::Guess(guess) => self.process_guess(player_id, guess),
            PlayerRequest::GiveUp => self.give_up(player_id),
            PlayerRequest::Restart => self.restart_game(player_id),
            PlayerRequest::Decision(decision) => {
                self.process_post_game_decision(player_id, decision)
            }
            PlayerRequest::Kick { target } => self.kick_player(player_id, &target),
        }
    }

    /// The current player's move.
    ///
    /// A wrong move is not rejected: it costs a drink and the round goes on,
    /// unless that drink fills the bottle.
    pub fn process_action(
        &mut self,
        player_id: &PlayerId,
        action: Move,
    ) -> Result<Vec<Effect>, RoomError> {
        self.expect_phase(Phase::Action)?;
        if self.state.is_game_over {
            return Err(RoomError::GameOver);
        }
        let idx = self.index_of(player_id)?;
        if idx != self.state.current_player_index {
            return Err(RoomError::NotYourTurn);
        }
        if self.state.players[idx].last_action.is_some() {
            return Err(RoomError::AlreadyActed);
        }

        let correct = rules::is_correct_action(self.state.box_on_table, action);
        self.state.box_on_table = rules::box_after(self.state.box_on_table, action);

        let player = &mut self.state.players[idx];
        player.last_action = Some(action);
        if !correct {
            player.drink_level += 1;
        }
        let drink_level = player.drink_level;
        let bottle_full = rules::is_bottle_full(player, &self.config);

        debug!(
            room_id = %self.room_id,
            %player_id,
            %action,
            correct,
            drink_level,
            round = self.state.current_round,
            "action recorded"
        );

        let mut out = Vec::new();
        if bottle_full {
            let reason = format!("{player_id} filled their bottle");
            self.end_match(Some(rules::opponent_of(idx)), Some(idx), reason, &mut out);
        } else {
            self.enter_guessing(&mut out);
        }
        Ok(out)
    }

    /// The other player's guess at the move just made.
    pub fn process_guess(
        &mut self,
        player_id: &PlayerId,
        guess: Move,
    ) -> Result<Vec<Effect>, RoomError> {
        self.expect_phase(Phase::Guessing)?;
        if self.state.is_game_over {
            return Err(RoomError::GameOver);
        }
        let idx = self.index_of(player_id)?;
        if idx == self.state.current_player_index {
            return Err(RoomError::CannotGuessOwnAction);
        }
        if self.state.players[idx].guess.is_some() {
            return Err(RoomError::AlreadyGuessed);
        }

        self.state.players[idx].guess = Some(guess);
        debug!(room_id = %self.room_id, %player_id, %guess, "guess recorded");

        let mut out = vec![Effect::CancelTimers];
        self.validate_round(&mut out);
        Ok(out)
    }

    /// Records a post-game decision and resolves once both are in.
    pub fn process_post_game_decision(
        &mut self,
        player_id: &PlayerId,
        decision: Decision,
    ) -> Result<Vec<Effect>, RoomError> {
        self.expect_phase(Phase::PostGame)?;
        let idx = self.index_of(player_id)?;

        let player = &mut self.state.players[idx];
        if !matches!(
            player.post_game_decision,
            None | Some(PostGameDecision::Pending)
        ) {
            return Err(RoomError::AlreadyDecided);
        }
        player.post_game_decision = Some(decision.into());
        debug!(room_id = %self.room_id, %player_id, ?decision, "post-game decision");

        let mut out = Vec::new();
        let all_decided = self.state.players.iter().all(|p| {
            matches!(
                p.post_game_decision,
                Some(PostGameDecision::Continue | PostGameDecision::End)
            )
        });
        if !all_decided {
            self.broadcast_state(&mut out);
            self.push_post_game_status(&mut out);
            return Ok(out);
        }

        if let Some(post) = &mut self.state.post_game_state {
            post.waiting_for_decisions = false;
        }
        self.push_post_game_status(&mut out);

        let quitter = self
            .state
            .players
            .iter()
            .find(|p| p.post_game_decision == Some(PostGameDecision::End))
            .map(|p| p.id.clone());
        match quitter {
            Some(quitter) => {
                let winner = self.state.winner.clone();
                self.finish_game(winner, format!("{quitter} chose to end the game"), &mut out);
            }
            None => self.rematch(&mut out),
        }
        Ok(out)
    }

    /// Concedes the match to the opponent.
    pub fn give_up(&mut self, player_id: &PlayerId) -> Result<Vec<Effect>, RoomError> {
        let idx = self.index_of(player_id)?;
        let phase = self.state.phase;
        if !(phase.is_in_play() || phase == Phase::PostGame) {
            return Err(RoomError::CannotGiveUp(phase));
        }

        let winner = (self.participants.len() == MAX_PLAYERS)
            .then(|| self.participants[rules::opponent_of(idx)].clone());
        let mut out = Vec::new();
        self.finish_game(winner, format!("{player_id} gave up"), &mut out);
        Ok(out)
    }

    /// Asks for a fresh match.
    ///
    /// During `postGame` this is a `continue` vote. After `gameOver` it
    /// rebuilds the game for whoever is present.
    pub fn restart_game(&mut self, player_id: &PlayerId) -> Result<Vec<Effect>, RoomError> {
        self.index_of(player_id)?;
        match self.state.phase {
            Phase::PostGame => self.process_post_game_decision(player_id, Decision::Continue),
            Phase::GameOver => {
                let mut out = Vec::new();
                self.reset(&mut out);
                info!(room_id = %self.room_id, %player_id, "game restarted");
                self.broadcast_state(&mut out);
                if self.participants.len() == MAX_PLAYERS {
                    self.schedule(TimerKind::Restart, self.config.restart_delay, &mut out);
                }
                Ok(out)
            }
            other => Err(RoomError::CannotRestart(other)),
        }
    }

    /// The winner removes the loser. The room goes back to `waiting`.
    pub fn kick_player(
        &mut self,
        requester: &PlayerId,
        target: &PlayerId,
    ) -> Result<Vec<Effect>, RoomError> {
        self.expect_phase(Phase::PostGame)?;
        self.index_of(requester)?;
        if self.state.winner.as_ref() != Some(requester) {
            return Err(RoomError::KickNotAllowed("Only the winner can kick".into()));
        }
        if target == requester {
            return Err(RoomError::KickNotAllowed("You cannot kick yourself".into()));
        }
        let target_idx = self.index_of(target)?;

        let mut out = vec![
            Effect::Send(
                Recipient::Player(target.clone()),
                ServerMessage::notice(format!(
                    "You were removed from room {} by {requester}",
                    self.room_id
                )),
            ),
            Effect::Detach(target.clone()),
        ];
        self.participants.remove(target_idx);
        info!(room_id = %self.room_id, %requester, %target, "player kicked");

        self.reset(&mut out);
        out.push(Effect::Send(
            Recipient::All,
            ServerMessage::notice(format!("{target} was removed from the room")),
        ));
        self.broadcast_state(&mut out);
        Ok(out)
    }

    // -- timers -------------------------------------------------------------

    /// Runs a fired timer. Stale timers do nothing.
    pub fn on_timer(&mut self, timer: Timer) -> Vec<Effect> {
        let current = self.stamp();
        if timer.stamp != current {
            debug!(
                room_id = %self.room_id,
                kind = ?timer.kind,
                armed = ?timer.stamp,
                ?current,
                "stale timer ignored"
            );
            return Vec::new();
        }

        let mut out = Vec::new();
        match timer.kind {
            TimerKind::GuessTimeout => {
                if self.state.is_game_over {
                    return out;
                }
                let guesser = self.state.guesser_index();
                if let Some(player) = self.state.players.get_mut(guesser) {
                    player.drink_level += 1;
                    debug!(
                        room_id = %self.room_id,
                        player_id = %player.id,
                        drink_level = player.drink_level,
                        "guess timed out"
                    );
                }
                self.validate_round(&mut out);
            }
            TimerKind::Countdown { time_left } => {
                out.push(Effect::Send(
                    Recipient::All,
                    ServerMessage::TimerUpdate {
                        time_left,
                        phase: self.state.phase,
                    },
                ));
                if time_left > 1 {
                    self.schedule(
                        TimerKind::Countdown {
                            time_left: time_left - 1,
                        },
                        self.config.countdown_interval,
                        &mut out,
                    );
                }
            }
            TimerKind::RoundPause => {
                if !self.state.is_game_over {
                    self.enter_action(&mut out);
                }
            }
            TimerKind::Restart => {
                if self.participants.len() == MAX_PLAYERS {
                    self.start_game(&mut out);
                }
            }
        }
        out
    }

    // -- transitions --------------------------------------------------------

    fn start_game(&mut self, out: &mut Vec<Effect>) {
        info!(
            room_id = %self.room_id,
            generation = self.generation,
            box_on_table = self.state.box_on_table,
            "game started"
        );
        out.push(Effect::Send(
            Recipient::All,
            ServerMessage::GameStart {
                room_id: self.room_id.clone(),
            },
        ));
        self.enter_action(out);
    }

    fn enter_action(&mut self, out: &mut Vec<Effect>) {
        out.push(Effect::CancelTimers);
        self.state.phase = Phase::Action;
        self.state.round_timer = 0;
        for player in &mut self.state.players {
            player.clear_round();
        }
        debug!(
            room_id = %self.room_id,
            round = self.state.current_round,
            current_player = self.state.current_player_index,
            "action phase"
        );
        self.broadcast_state(out);
    }

    fn enter_guessing(&mut self, out: &mut Vec<Effect>) {
        out.push(Effect::CancelTimers);
        let limit = self.config.guess_time_limit;
        self.state.phase = Phase::Guessing;
        self.state.round_timer = limit.as_millis() as u64;
        self.broadcast_state(out);
        self.schedule(TimerKind::GuessTimeout, limit, out);
        self.start_countdown(limit, out);
    }

    /// Scores the round, then either ends the match or sets up the next one.
    fn validate_round(&mut self, out: &mut Vec<Effect>) {
        self.state.phase = Phase::Validation;
        self.state.round_timer = 0;

        let actor = self.state.current_player_index;
        let guesser = self.state.guesser_index();
        let actual = self.state.players.get(actor).and_then(|p| p.last_action);
        if let Some(player) = self.state.players.get_mut(guesser) {
            if rules::guess_is_wrong(actual, player.guess) {
                player.drink_level += 1;
            }
        }

        match rules::round_verdict(&self.state, &self.config) {
            Verdict::Continue => self.next_round(out),
            Verdict::BottleFull { loser } => {
                let reason = format!("{} filled their bottle", self.state.players[loser].id);
                self.end_match(Some(rules::opponent_of(loser)), Some(loser), reason, out);
            }
            Verdict::RoundLimit {
                winner: Some(winner),
            } => {
                let reason = format!(
                    "{} drank less after {} rounds",
                    self.state.players[winner].id, self.config.round_limit
                );
                self.end_match(Some(winner), Some(rules::opponent_of(winner)), reason, out);
            }
            Verdict::RoundLimit { winner: None } => {
                let reason = format!("Draw after {} rounds", self.config.round_limit);
                self.end_match(None, None, reason, out);
            }
        }
    }

    fn next_round(&mut self, out: &mut Vec<Effect>) {
        self.state.current_player_index = rules::opponent_of(self.state.current_player_index);
        self.state.round_number += 1;
        self.state.current_round = self.state.round_number;
        for player in &mut self.state.players {
            player.clear_round();
        }
        let pause = self.config.round_pause;
        self.state.round_timer = pause.as_millis() as u64;
        debug!(
            room_id = %self.room_id,
            round = self.state.current_round,
            "round validated"
        );

        self.broadcast_state(out);
        self.schedule(TimerKind::RoundPause, pause, out);
        self.start_countdown(pause, out);
    }

    /// Moves to `postGame` and opens the continue/end negotiation.
    fn end_match(
        &mut self,
        winner: Option<usize>,
        loser: Option<usize>,
        reason: String,
        out: &mut Vec<Effect>,
    ) {
        out.push(Effect::CancelTimers);
        let winner_id = winner.and_then(|i| self.state.players.get(i)).map(|p| p.id.clone());
        let loser_id = loser.and_then(|i| self.state.players.get(i)).map(|p| p.id.clone());

        self.state.phase = Phase::PostGame;
        self.state.is_game_over = true;
        self.state.winner = winner_id.clone();
        self.state.round_timer = 0;
        for player in &mut self.state.players {
            player.post_game_decision = Some(PostGameDecision::Pending);
        }
        info!(
            room_id = %self.room_id,
            winner = ?winner_id,
            round = self.state.current_round,
            %reason,
            "match finished"
        );
        self.state.post_game_state = Some(PostGameState {
            winner_id,
            loser_id,
            reason,
            waiting_for_decisions: true,
        });

        self.broadcast_state(out);
        self.push_post_game_status(out);
    }

    /// Ends the session for good: `gameOver`, negotiation cleared.
    fn finish_game(&mut self, winner: Option<PlayerId>, reason: String, out: &mut Vec<Effect>) {
        out.push(Effect::CancelTimers);
        self.state.phase = Phase::GameOver;
        self.state.is_game_over = true;
        self.state.winner = winner;
        self.state.round_timer = 0;
        self.state.post_game_state = None;
        for player in &mut self.state.players {
            player.post_game_decision = None;
        }
        info!(
            room_id = %self.room_id,
            winner = ?self.state.winner,
            %reason,
            "game over"
        );
        out.push(Effect::Send(Recipient::All, ServerMessage::notice(reason)));
        self.broadcast_state(out);
    }

    fn rematch(&mut self, out: &mut Vec<Effect>) {
        info!(room_id = %self.room_id, "rematch agreed");
        self.reset(out);
        self.broadcast_state(out);
        self.schedule(TimerKind::Restart, self.config.restart_delay, out);
    }

    /// Replaces the game with a fresh `waiting` one for the current
    /// participants.
    fn reset(&mut self, out: &mut Vec<Effect>) {
        out.push(Effect::CancelTimers);
        self.generation += 1;
        self.state = GameState::new(&self.participants, fresh_box(&self.config));
    }

    // -- helpers ------------------------------------------------------------

    fn start_countdown(&self, total: Duration, out: &mut Vec<Effect>) {
        let ticks = self.config.countdown_ticks(total);
        if ticks == 0 {
            return;
        }
        out.push(Effect::Send(
            Recipient::All,
            ServerMessage::TimerUpdate {
                time_left: ticks,
                phase: self.state.phase,
            },
        ));
        if ticks > 1 {
            self.schedule(
                TimerKind::Countdown {
                    time_left: ticks - 1,
                },
                self.config.countdown_interval,
                out,
            );
        }
    }

    fn schedule(&self, kind: TimerKind, after: Duration, out: &mut Vec<Effect>) {
        out.push(Effect::Schedule {
            timer: Timer {
                kind,
                stamp: self.stamp(),
            },
            after,
        });
    }

    fn broadcast_state(&self, out: &mut Vec<Effect>) {
        out.push(Effect::Send(
            Recipient::All,
            ServerMessage::GameState {
                state: self.state.clone(),
            },
        ));
    }

    fn push_post_game_status(&self, out: &mut Vec<Effect>) {
        if let Some(status) = self.post_game_status() {
            out.push(Effect::Send(Recipient::All, status));
        }
    }

    /// The `postGameState` message for the current negotiation, if any.
    pub fn post_game_status(&self) -> Option<ServerMessage> {
        let post = self.state.post_game_state.as_ref()?;
        Some(ServerMessage::PostGameState {
            winner_id: post.winner_id.clone(),
            loser_id: post.loser_id.clone(),
            reason: post.reason.clone(),
            can_kick: post.winner_id.is_some(),
            waiting_for_decisions: post.waiting_for_decisions,
            player_decisions: self
                .state
                .players
                .iter()
                .map(|p| PlayerDecision {
                    player_id: p.id.clone(),
                    decision: p.post_game_decision.unwrap_or(PostGameDecision::Pending),
                })
                .collect(),
        })
    }

    fn expect_phase(&self, expected: Phase) -> Result<(), RoomError> {
        if self.state.phase == expected {
            Ok(())
        } else {
            Err(RoomError::WrongPhase {
                expected,
                actual: self.state.phase,
            })
        }
    }

    fn index_of(&self, player_id: &PlayerId) -> Result<usize, RoomError> {
        self.participants
            .iter()
            .position(|p| p == player_id)
            .ok_or_else(|| RoomError::NotInRoom(player_id.clone(), self.room_id.clone()))
    }
}

/// Where the box starts in a new game.
fn fresh_box(config: &RoomConfig) -> bool {
    config
        .initial_box_on_table
        .unwrap_or_else(|| rand::rng().random_bool(0.5))
}
