use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::RoomPublisher;
use crate::domain::RoomEvent;

struct SessionHandle {
    user_id: Uuid,
    sender: mpsc::UnboundedSender<String>,
}

#[derive(Default)]
struct HubState {
    sessions: HashMap<Uuid, SessionHandle>,
    /// conversation id -> session ids joined to its room
    rooms: HashMap<Uuid, HashSet<Uuid>>,
}

impl HubState {
    fn remove_from_room(&mut self, conversation_id: Uuid, session_id: Uuid) -> bool {
        let Some(members) = self.rooms.get_mut(&conversation_id) else {
            return false;
        };
        let removed = members.remove(&session_id);
        if members.is_empty() {
            self.rooms.remove(&conversation_id);
        }
        removed
    }
}

/// In-process room registry. Each socket registers one session; joining a
/// conversation subscribes that session to the room's events.
#[derive(Clone, Default)]
pub struct WsConnectionHub {
    state: Arc<RwLock<HubState>>,
}

impl WsConnectionHub {
    fn read_state(&self) -> RwLockReadGuard<'_, HubState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, HubState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, user_id: Uuid) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let session_id = Uuid::new_v4();
        self.write_state()
            .sessions
            .insert(session_id, SessionHandle { user_id, sender });
        (session_id, receiver)
    }

    /// Drops the session and every room subscription it held.
    pub fn unregister(&self, session_id: Uuid) {
        let mut state = self.write_state();
        state.sessions.remove(&session_id);
        state.rooms.retain(|_, members| {
            members.remove(&session_id);
            !members.is_empty()
        });
    }

    /// Returns `false` when the session was already in the room.
    pub fn join(&self, session_id: Uuid, conversation_id: Uuid) -> bool {
        let mut state = self.write_state();
        if !state.sessions.contains_key(&session_id) {
            return false;
        }
        state
            .rooms
            .entry(conversation_id)
            .or_default()
            .insert(session_id)
    }

    pub fn leave(&self, session_id: Uuid, conversation_id: Uuid) -> bool {
        self.write_state().remove_from_room(conversation_id, session_id)
    }

    pub fn is_member(&self, session_id: Uuid, conversation_id: Uuid) -> bool {
        self.read_state()
            .rooms
            .get(&conversation_id)
            .is_some_and(|members| members.contains(&session_id))
    }

    pub fn room_count(&self) -> usize {
        self.read_state().rooms.len()
    }

    pub fn room_size(&self, conversation_id: Uuid) -> usize {
        self.read_state()
            .rooms
            .get(&conversation_id)
            .map_or(0, HashSet::len)
    }

    pub fn session_user(&self, session_id: Uuid) -> Option<Uuid> {
        self.read_state()
            .sessions
            .get(&session_id)
            .map(|session| session.user_id)
    }

    /// Sends to every session in the room except `except`. Sessions whose
    /// receiver is gone are pruned. Returns the number of deliveries.
    pub fn broadcast(&self, conversation_id: Uuid, payload: &str, except: Option<Uuid>) -> usize {
        let targets: Vec<(Uuid, mpsc::UnboundedSender<String>)> = {
            let state = self.read_state();
            let Some(members) = state.rooms.get(&conversation_id) else {
                return 0;
            };
            members
                .iter()
                .filter(|session_id| Some(**session_id) != except)
                .filter_map(|session_id| {
                    state
                        .sessions
                        .get(session_id)
                        .map(|session| (*session_id, session.sender.clone()))
                })
                .collect()
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (session_id, sender) in targets {
            if sender.send(payload.to_string()).is_ok() {
                delivered += 1;
            } else {
                closed.push(session_id);
            }
        }

        if !closed.is_empty() {
            debug!(count = closed.len(), "pruning closed websocket sessions");
            for session_id in closed {
                self.unregister(session_id);
            }
        }
        delivered
    }
}

impl RoomPublisher for WsConnectionHub {
    fn publish(&self, event: &RoomEvent) -> usize {
        match serde_json::to_string(event) {
            Ok(payload) => self.broadcast(event.conversation_id(), &payload, None),
            Err(error) => {
                warn!(event = event.name(), error = %error, "failed to serialize room event");
                0
            }
        }
    }
}
