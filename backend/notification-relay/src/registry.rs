/// Connection registry
///
/// Tracks which logical user owns which live connection(s) and which
/// connections are members of which rooms. All three indices live in one
/// state struct behind a single lock, so a reader never sees a connection
/// that is gone from the user index but still present in a room (or the
/// reverse).
///
/// Lifecycle of a handle:
/// - `connect` creates the record (unregistered)
/// - `register` binds or rebinds it to a user id, last writer wins
/// - `on_disconnect` removes it from every index; later calls are no-ops
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier of one live transport connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Registry-side view of a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub user_id: Option<String>,
    pub rooms: HashSet<String>,
    pub connected_at: DateTime<Utc>,
}

/// Point-in-time registry counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub connections: usize,
    pub registered_connections: usize,
    pub users: usize,
    pub rooms: usize,
}

#[derive(Debug, Default)]
struct RegistryState {
    connections: HashMap<ConnectionId, Connection>,
    users: HashMap<String, HashSet<ConnectionId>>,
    rooms: HashMap<String, HashSet<ConnectionId>>,
}

impl RegistryState {
    fn unbind_user(&mut self, id: ConnectionId, user_id: &str) {
        if let Some(handles) = self.users.get_mut(user_id) {
            handles.remove(&id);
            if handles.is_empty() {
                self.users.remove(user_id);
            }
        }
    }

    fn remove_member(&mut self, room: &str, id: ConnectionId) -> bool {
        let Some(members) = self.rooms.get_mut(room) else {
            return false;
        };
        let removed = members.remove(&id);
        if members.is_empty() {
            self.rooms.remove(room);
        }
        removed
    }
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    state: RwLock<RegistryState>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly accepted connection.
    ///
    /// Returns `false` if the handle was already known.
    pub fn connect(&self, id: ConnectionId) -> bool {
        let mut state = self.state.write();
        if state.connections.contains_key(&id) {
            return false;
        }
        state.connections.insert(
            id,
            Connection {
                id,
                user_id: None,
                rooms: HashSet::new(),
                connected_at: Utc::now(),
            },
        );
        tracing::debug!(connection_id = %id, total = state.connections.len(), "Connection added");
        true
    }

    /// Bind `id` to `user_id`, replacing any previous binding.
    ///
    /// Room memberships are untouched. Returns `false` when the handle is
    /// not live.
    pub fn register(&self, id: ConnectionId, user_id: &str) -> bool {
        let mut state = self.state.write();
        let previous = match state.connections.get_mut(&id) {
            Some(conn) => conn.user_id.replace(user_id.to_string()),
            None => {
                tracing::debug!(connection_id = %id, "Register on unknown connection ignored");
                return false;
            }
        };

        if let Some(prev) = previous.as_deref() {
            if prev != user_id {
                state.unbind_user(id, prev);
                tracing::debug!(connection_id = %id, from = %prev, to = %user_id, "Connection rebound");
            }
        }
        state.users.entry(user_id.to_string()).or_default().insert(id);
        true
    }

    /// Drop a connection from every index in one step.
    pub fn on_disconnect(&self, id: ConnectionId) -> Option<Connection> {
        let mut state = self.state.write();
        let conn = state.connections.remove(&id)?;

        if let Some(user_id) = conn.user_id.as_deref() {
            state.unbind_user(id, user_id);
        }
        for room in &conn.rooms {
            state.remove_member(room, id);
        }

        tracing::debug!(
            connection_id = %id,
            user_id = ?conn.user_id,
            rooms = conn.rooms.len(),
            remaining = state.connections.len(),
            "Connection removed"
        );
        Some(conn)
    }

    /// Add `id` to `room`, creating the room on first join.
    ///
    /// Returns `false` when the handle is not live.
    pub fn join_room(&self, id: ConnectionId, room: &str) -> bool {
        let mut state = self.state.write();
        match state.connections.get_mut(&id) {
            Some(conn) => {
                conn.rooms.insert(room.to_string());
            }
            None => return false,
        }
        state.rooms.entry(room.to_string()).or_default().insert(id);
        true
    }

    /// Remove `id` from `room`. Returns whether it was a member.
    pub fn leave_room(&self, id: ConnectionId, room: &str) -> bool {
        let mut state = self.state.write();
        if let Some(conn) = state.connections.get_mut(&id) {
            conn.rooms.remove(room);
        }
        state.remove_member(room, id)
    }

    pub fn resolve_user(&self, user_id: &str) -> HashSet<ConnectionId> {
        self.state
            .read()
            .users
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn resolve_room(&self, room: &str) -> HashSet<ConnectionId> {
        self.state.read().rooms.get(room).cloned().unwrap_or_default()
    }

    pub fn is_connected(&self, user_id: &str) -> bool {
        self.state
            .read()
            .users
            .get(user_id)
            .map_or(false, |handles| !handles.is_empty())
    }

    pub fn list_connected_users(&self) -> HashSet<String> {
        self.state.read().users.keys().cloned().collect()
    }

    /// Current user binding of a connection
    pub fn user_of(&self, id: ConnectionId) -> Option<String> {
        self.state
            .read()
            .connections
            .get(&id)
            .and_then(|conn| conn.user_id.clone())
    }

    pub fn stats(&self) -> RegistryStats {
        let state = self.state.read();
        RegistryStats {
            connections: state.connections.len(),
            registered_connections: state.users.values().map(HashSet::len).sum(),
            users: state.users.len(),
            rooms: state.rooms.len(),
        }
    }
}
