//! Session state and the pulse/broadcast tick loop
//!
//! A session owns the connected users of one room/map instance. All deltas
//! produced between two pulses buffer in a queue; each pulse flushes the
//! whole queue as one batched frame to every member, so network writes are
//! O(members) per tick no matter how many state changes occurred.
//!
//! `SessionCore` is the synchronous state machine; `Session` wraps it in a
//! task driven by a command channel and a fixed-interval clock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::assets::character::CharacterCatalog;
use crate::assets::map::MapDefinition;
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::user::{User, UserId};

/// Commands routed into a session task
#[derive(Debug)]
pub enum SessionCmd {
    /// A user joins this session
    Join(User),
    /// A user's connection closed
    Leave(UserId),
    /// A decoded inbound message from a member
    Input { id: UserId, msg: ClientMsg },
}

/// Synchronous session state. Mutated only by the owning task, so the
/// read-queue-then-clear in `flush` has no intervening mutation opportunity.
pub struct SessionCore {
    id: u64,
    map: Arc<MapDefinition>,
    characters: Arc<CharacterCatalog>,
    users: HashMap<UserId, User>,
    queue: Vec<ServerMsg>,
}

impl SessionCore {
    pub fn new(id: u64, map: Arc<MapDefinition>, characters: Arc<CharacterCatalog>) -> Self {
        Self {
            id,
            map,
            characters,
            users: HashMap::new(),
            queue: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn map(&self) -> &Arc<MapDefinition> {
        &self.map
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    /// Add a user and queue a full snapshot for every member, the joiner
    /// included. Membership changes always resynchronize with a full
    /// snapshot rather than an incremental diff.
    pub fn join(&mut self, user: User) {
        info!(session_id = self.id, user_id = user.id, name = %user.name, "User joined session");
        self.users.insert(user.id, user);
        let snapshot = self.snapshot();
        self.enqueue(snapshot);
    }

    /// Remove a user and queue a full snapshot for the remainder
    pub fn leave(&mut self, id: UserId) -> Option<User> {
        let user = self.users.remove(&id)?;
        info!(session_id = self.id, user_id = id, "User left session");
        let snapshot = self.snapshot();
        self.enqueue(snapshot);
        Some(user)
    }

    /// Full serialization of every member
    pub fn snapshot(&self) -> ServerMsg {
        ServerMsg::Session {
            users: self.users.values().map(|u| u.snapshot()).collect(),
        }
    }

    /// Buffer one message for the next pulse; no network I/O happens here
    pub fn enqueue(&mut self, msg: ServerMsg) {
        self.queue.push(msg);
    }

    /// Buffer several messages for the next pulse
    pub fn enqueue_all<I>(&mut self, msgs: I)
    where
        I: IntoIterator<Item = ServerMsg>,
    {
        self.queue.extend(msgs);
    }

    /// Route a decoded inbound message to its member and queue any resulting
    /// delta. Messages for ids not in this session are dropped.
    pub fn handle_event(&mut self, id: UserId, msg: ClientMsg) {
        let characters = Arc::clone(&self.characters);
        let Some(user) = self.users.get_mut(&id) else {
            debug!(session_id = self.id, user_id = id, "Input for unknown user");
            return;
        };

        if let Some(properties) = user.dispatch(msg, &characters) {
            if !properties.is_empty() {
                self.enqueue(ServerMsg::Update { id, properties });
            }
        }
    }

    /// Step every character whose motion clock is running and queue the
    /// per-character combined deltas
    pub fn step_motion(&mut self) {
        let mut updates = Vec::new();
        for user in self.users.values_mut() {
            if !user.character.motion_running() {
                continue;
            }
            if let Some(properties) = user.character.tick() {
                updates.push(ServerMsg::Update {
                    id: user.id,
                    properties,
                });
            }
        }
        self.enqueue_all(updates);
    }

    /// One pulse: serialize the whole queue as a single batched frame, clear
    /// it, and write the frame to every member. An empty queue sends nothing.
    pub fn flush(&mut self) {
        if self.queue.is_empty() {
            return;
        }

        let frame = match serde_json::to_string(&self.queue) {
            Ok(frame) => frame,
            Err(e) => {
                error!(session_id = self.id, error = %e, "Failed to serialize pulse frame");
                self.queue.clear();
                return;
            }
        };
        self.queue.clear();

        for user in self.users.values() {
            if user.send(frame.clone()).is_err() {
                // Eviction happens on the transport close event.
                debug!(session_id = self.id, user_id = user.id, "Send to closed connection");
            }
        }
    }
}

/// Handle to a running session task
#[derive(Clone)]
pub struct SessionHandle {
    pub id: u64,
    cmd_tx: mpsc::Sender<SessionCmd>,
    user_count: Arc<AtomicUsize>,
}

impl SessionHandle {
    pub fn user_count(&self) -> usize {
        self.user_count.load(Ordering::Relaxed)
    }

    /// Deliver a command to the session task; false means the task is gone
    pub async fn send(&self, cmd: SessionCmd) -> bool {
        self.cmd_tx.send(cmd).await.is_ok()
    }

    pub async fn join(&self, user: User) -> bool {
        self.send(SessionCmd::Join(user)).await
    }

    pub async fn leave(&self, id: UserId) -> bool {
        self.send(SessionCmd::Leave(id)).await
    }

    pub async fn input(&self, id: UserId, msg: ClientMsg) -> bool {
        self.send(SessionCmd::Input { id, msg }).await
    }
}

/// A session task: core state plus its command channel and pulse clock.
/// Sessions persist at zero members; the task only exits when every handle
/// is dropped.
pub struct Session {
    core: SessionCore,
    cmd_rx: mpsc::Receiver<SessionCmd>,
    tick_interval: Duration,
    user_count: Arc<AtomicUsize>,
}

impl Session {
    pub fn new(
        id: u64,
        map: Arc<MapDefinition>,
        characters: Arc<CharacterCatalog>,
        tick_interval: Duration,
    ) -> (Self, SessionHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(256);
        let user_count = Arc::new(AtomicUsize::new(0));

        let handle = SessionHandle {
            id,
            cmd_tx,
            user_count: user_count.clone(),
        };

        let session = Self {
            core: SessionCore::new(id, map, characters),
            cmd_rx,
            tick_interval,
            user_count,
        };

        (session, handle)
    }

    /// Run the pulse loop
    pub async fn run(mut self) {
        info!(session_id = self.core.id(), map = %self.core.map().name, "Session started");

        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => self.apply(cmd),
                    None => break,
                },
                _ = ticker.tick() => {
                    self.core.step_motion();
                    self.core.flush();
                }
            }
        }

        info!(session_id = self.core.id(), "Session stopped");
    }

    fn apply(&mut self, cmd: SessionCmd) {
        match cmd {
            SessionCmd::Join(user) => {
                self.core.join(user);
                self.user_count.store(self.core.user_count(), Ordering::Relaxed);
            }
            SessionCmd::Leave(id) => {
                self.core.leave(id);
                self.user_count.store(self.core.user_count(), Ordering::Relaxed);
            }
            SessionCmd::Input { id, msg } => self.core.handle_event(id, msg),
        }
    }
}
