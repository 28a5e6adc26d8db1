//! Room actor: an isolated Tokio task that owns one [`Room`].
//!
//! Each room runs in its own task and talks to the outside world through an
//! mpsc channel. Commands and timer firings are handled one at a time from a
//! single `select!` loop, so the game state needs no lock.

use std::collections::HashMap;

use konpira_protocol::{GameState, Phase, PlayerId, Recipient, RoomId, ServerMessage};
use konpira_session::OutboundSender;
use konpira_timer::TimerQueue;
use tokio::sync::{mpsc, oneshot};

use crate::room::{Effect, PlayerRequest, Room, Timer};
use crate::{RoomConfig, RoomError};

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in each variant is the reply channel.
pub(crate) enum RoomCommand {
    /// Seat a player. Replies with the new participant count.
    Join {
        player_id: PlayerId,
        sender: OutboundSender,
        reply: oneshot::Sender<Result<usize, RoomError>>,
    },

    /// Remove a player. Replies with the remaining participant count.
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<usize, RoomError>>,
    },

    /// A participant's game request.
    Request {
        player_id: PlayerId,
        request: PlayerRequest,
        reply: oneshot::Sender<Result<Ack, RoomError>>,
    },

    /// Snapshot the room.
    Info { reply: oneshot::Sender<RoomInfo> },

    /// Stop the actor.
    Shutdown,
}

/// Reply to a successful [`RoomHandle::request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Players the request removed from the room (a kick).
    pub detached: Vec<PlayerId>,
    /// Participants left afterwards.
    pub player_count: usize,
}

/// A snapshot of one room.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub phase: Phase,
    pub player_count: usize,
    pub state: GameState,
}

/// Handle to a running room actor.
///
/// Cheap to clone: it is just an `mpsc::Sender` wrapper.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's id.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.room_id.clone())
    }

    /// Seats a player whose messages go to `sender`.
    pub async fn join(
        &self,
        player_id: PlayerId,
        sender: OutboundSender,
    ) -> Result<usize, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                player_id,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Removes a player. Returns how many remain.
    pub async fn leave(&self, player_id: PlayerId) -> Result<usize, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Leave {
                player_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Delivers a game request and waits for the verdict.
    pub async fn request(
        &self,
        player_id: PlayerId,
        request: PlayerRequest,
    ) -> Result<Ack, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Request {
                player_id,
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Requests a snapshot of the room.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Info { reply: reply_tx })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| self.unavailable())
    }
}

enum Event {
    Command(RoomCommand),
    Timer(Timer),
}

/// The internal actor state. Runs inside a Tokio task.
struct RoomActor {
    room: Room,
    /// Per-player outbound channels.
    senders: HashMap<PlayerId, OutboundSender>,
    timers: TimerQueue<Timer>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop until shutdown or until every handle is gone.
    async fn run(mut self) {
        tracing::info!(room_id = %self.room.room_id(), "room actor started");

        loop {
            let event = tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => Event::Command(cmd),
                    None => break,
                },
                timer = self.timers.wait_next() => Event::Timer(timer),
            };

            match event {
                Event::Command(RoomCommand::Shutdown) => {
                    tracing::info!(room_id = %self.room.room_id(), "room shutting down");
                    break;
                }
                Event::Command(cmd) => self.handle_command(cmd),
                Event::Timer(timer) => {
                    tracing::debug!(
                        room_id = %self.room.room_id(),
                        kind = ?timer.kind,
                        "timer fired"
                    );
                    let effects = self.room.on_timer(timer);
                    self.apply(effects);
                }
            }
        }

        let metrics = self.timers.metrics();
        tracing::info!(
            room_id = %self.room.room_id(),
            timers_fired = metrics.fired,
            timers_cancelled = metrics.cancelled,
            "room actor stopped"
        );
    }

    fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                player_id,
                sender,
                reply,
            } => {
                let result = self.room.join(player_id.clone()).map(|effects| {
                    self.senders.insert(player_id, sender);
                    self.apply(effects);
                    self.room.player_count()
                });
                let _ = reply.send(result);
            }
            RoomCommand::Leave { player_id, reply } => {
                let result = self.room.leave(&player_id).map(|effects| {
                    self.senders.remove(&player_id);
                    self.apply(effects);
                    self.room.player_count()
                });
                let _ = reply.send(result);
            }
            RoomCommand::Request {
                player_id,
                request,
                reply,
            } => {
                let result = self.room.handle(&player_id, request).map(|effects| Ack {
                    detached: self.apply(effects),
                    player_count: self.room.player_count(),
                });
                if let Err(e) = &result {
                    tracing::debug!(
                        room_id = %self.room.room_id(),
                        %player_id,
                        phase = %self.room.state().phase,
                        error = %e,
                        "request rejected"
                    );
                }
                let _ = reply.send(result);
            }
            RoomCommand::Info { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Shutdown => {}
        }
    }

    /// Carries out the room's effects. Returns the players it detached.
    fn apply(&mut self, effects: Vec<Effect>) -> Vec<PlayerId> {
        let mut detached = Vec::new();
        for effect in effects {
            match effect {
                Effect::Send(recipient, msg) => self.dispatch(recipient, msg),
                Effect::Schedule { timer, after } => {
                    self.timers.schedule(after, timer);
                }
                Effect::CancelTimers => {
                    self.timers.cancel_all();
                }
                Effect::Detach(player_id) => {
                    self.senders.remove(&player_id);
                    detached.push(player_id);
                }
            }
        }
        detached
    }

    /// Delivers a message to the selected players.
    fn dispatch(&self, recipient: Recipient, msg: ServerMessage) {
        match recipient {
            Recipient::All => {
                for pid in self.senders.keys() {
                    self.send_to(pid, msg.clone());
                }
            }
            Recipient::Player(pid) => self.send_to(&pid, msg),
            Recipient::AllExcept(excluded) => {
                for pid in self.senders.keys().filter(|pid| **pid != excluded) {
                    self.send_to(pid, msg.clone());
                }
            }
        }
    }

    /// Sends to a single player. Silently drops if their connection is gone.
    fn send_to(&self, player_id: &PlayerId, msg: ServerMessage) {
        if let Some(sender) = self.senders.get(player_id) {
            let _ = sender.send(msg);
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room.room_id().clone(),
            phase: self.room.state().phase,
            player_count: self.room.player_count(),
            state: self.room.state().clone(),
        }
    }
}

/// Spawns a room actor task and returns a handle to it.
///
/// `channel_size` bounds the command queue; senders wait when it is full.
pub(crate) fn spawn_room(room_id: RoomId, config: RoomConfig, channel_size: usize) -> RoomHandle {
    let (sender, receiver) = mpsc::channel(channel_size);
    let actor = RoomActor {
        room: Room::new(room_id.clone(), config),
        senders: HashMap::new(),
        timers: TimerQueue::new(),
        receiver,
    };
    tokio::spawn(actor.run());
    RoomHandle { room_id, sender }
}
