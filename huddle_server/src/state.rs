//! Relay state: the connection registry and room directory.
//!
//! This is the only shared mutable state in the process. A connection is
//! registered on transport connect, optionally joins exactly one room, and
//! is unregistered on disconnect. Rooms are created lazily on first join
//! and removed as soon as their last member leaves; an empty room never
//! persists.
//!
//! All mutations go through a single [`RwLock`] scoped tightly to the
//! methods below, so join/leave/register/unregister are atomic with
//! respect to each other while reads may run concurrently. No operation
//! holds the lock across an `.await` on anything but the lock itself.

use std::collections::HashMap;
use std::sync::Arc;

use huddle_protocol::{PeerId, RoomId, ServerEvent};
use tokio::sync::{RwLock, mpsc};
use tracing::debug;

use crate::error::SignalingError;

/// Handle for queueing an outbound event to one connection.
///
/// Sends are fire-and-forget: the transport task owns the receiving end
/// and a send to a disconnected peer simply returns an error the relay
/// ignores.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// One live connection.
struct Client {
    username: Option<String>,
    room: Option<RoomId>,
    sender: EventSender,
}

/// Read-only snapshot of a connection's registry record.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientInfo {
    pub username: Option<String>,
    pub room: Option<RoomId>,
}

/// Result of a join: the room actually joined and who else was already
/// there, in join order.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinSnapshot {
    pub room: RoomId,
    pub others: Vec<PeerId>,
    /// False when the peer was already in a room and the join was a no-op.
    pub newly_joined: bool,
}

#[derive(Default)]
struct Inner {
    clients: HashMap<PeerId, Client>,
    /// Members in join order, for deterministic `currentUsers` listings.
    rooms: HashMap<RoomId, Vec<PeerId>>,
}

/// Shared relay state, cheap to clone into every connection task.
#[derive(Default, Clone)]
pub struct ServerState {
    inner: Arc<RwLock<Inner>>,
}

impl ServerState {
    /// Create empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly connected peer with its outbound channel.
    pub async fn register(&self, peer: PeerId, sender: EventSender) -> Result<(), SignalingError> {
        let mut inner = self.inner.write().await;
        if inner.clients.contains_key(&peer) {
            return Err(SignalingError::AlreadyRegistered(peer));
        }
        let _ = inner.clients.insert(
            peer,
            Client {
                username: None,
                room: None,
                sender,
            },
        );
        Ok(())
    }

    /// Look up a connection's registry record.
    pub async fn lookup(&self, peer: PeerId) -> Option<ClientInfo> {
        let inner = self.inner.read().await;
        inner.clients.get(&peer).map(|c| ClientInfo {
            username: c.username.clone(),
            room: c.room.clone(),
        })
    }

    /// Remove a peer entirely. Idempotent: unregistering an absent peer is
    /// a no-op, so duplicate disconnect signals are harmless.
    ///
    /// Also drops any remaining room membership without notifying the
    /// room; callers wanting a `userLeft` broadcast must run
    /// [`leave`](Self::leave) first and use the returned room.
    pub async fn unregister(&self, peer: PeerId) {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        if let Some(client) = inner.clients.remove(&peer)
            && let Some(room) = client.room
        {
            remove_member(&mut inner.rooms, &room, peer);
        }
    }

    /// Add a peer to a room, creating the room if needed, and return the
    /// members that were already present.
    ///
    /// A peer already in a room stays where it is: the join is an
    /// idempotent no-op that returns the current snapshot of *that* room,
    /// whatever room was requested. This is what keeps a connection from
    /// ever belonging to two rooms at once.
    pub async fn join(
        &self,
        peer: PeerId,
        room: RoomId,
        username: String,
    ) -> Result<JoinSnapshot, SignalingError> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let client = inner
            .clients
            .get_mut(&peer)
            .ok_or(SignalingError::UnknownPeer)?;

        if let Some(current) = client.room.clone() {
            let others = inner
                .rooms
                .get(&current)
                .map(|members| members.iter().copied().filter(|m| *m != peer).collect())
                .unwrap_or_default();
            debug!(%peer, room = %current, "duplicate join ignored");
            return Ok(JoinSnapshot {
                room: current,
                others,
                newly_joined: false,
            });
        }

        client.username = Some(username);
        client.room = Some(room.clone());

        let members = inner.rooms.entry(room.clone()).or_default();
        let others = members.clone();
        members.push(peer);

        Ok(JoinSnapshot {
            room,
            others,
            newly_joined: true,
        })
    }

    /// Remove a peer from whatever room it is in, deleting the room if
    /// that left it empty. Returns the vacated room so the caller can
    /// notify the remaining members, or `None` if the peer was not in a
    /// room (or not registered at all).
    pub async fn leave(&self, peer: PeerId) -> Option<RoomId> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let room = inner.clients.get_mut(&peer)?.room.take()?;
        remove_member(&mut inner.rooms, &room, peer);
        Some(room)
    }

    /// Members of a room in join order; empty if the room is unknown.
    pub async fn members_of(&self, room: &RoomId) -> Vec<PeerId> {
        let inner = self.inner.read().await;
        inner.rooms.get(room).cloned().unwrap_or_default()
    }

    /// Outbound channel of one peer, if it is still registered.
    pub async fn sender_of(&self, peer: PeerId) -> Option<EventSender> {
        let inner = self.inner.read().await;
        inner.clients.get(&peer).map(|c| c.sender.clone())
    }

    /// Outbound channels of every member of a room, in join order.
    pub async fn room_senders(&self, room: &RoomId) -> Vec<(PeerId, EventSender)> {
        let inner = self.inner.read().await;
        inner
            .rooms
            .get(room)
            .map(|members| {
                members
                    .iter()
                    .filter_map(|id| inner.clients.get(id).map(|c| (*id, c.sender.clone())))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn remove_member(rooms: &mut HashMap<RoomId, Vec<PeerId>>, room: &RoomId, peer: PeerId) {
    if let Some(members) = rooms.get_mut(room) {
        members.retain(|m| *m != peer);
        if members.is_empty() {
            let _ = rooms.remove(room);
            debug!(%room, "room emptied and removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn registered_peer(state: &ServerState) -> (PeerId, mpsc::UnboundedReceiver<ServerEvent>) {
        let peer = PeerId::random();
        let (tx, rx) = mpsc::unbounded_channel();
        state.register(peer, tx).await.unwrap();
        (peer, rx)
    }

    #[tokio::test]
    async fn register_rejects_duplicate_peer_id() {
        let state = ServerState::new();
        let (peer, _rx) = registered_peer(&state).await;
        let (tx, _rx2) = mpsc::unbounded_channel();
        assert!(matches!(
            state.register(peer, tx).await,
            Err(SignalingError::AlreadyRegistered(p)) if p == peer
        ));
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let state = ServerState::new();
        let (peer, _rx) = registered_peer(&state).await;
        state.unregister(peer).await;
        state.unregister(peer).await;
        assert_eq!(state.lookup(peer).await, None);
    }

    #[tokio::test]
    async fn join_returns_existing_members_in_join_order() {
        let state = ServerState::new();
        let (a, _rx_a) = registered_peer(&state).await;
        let (b, _rx_b) = registered_peer(&state).await;
        let (c, _rx_c) = registered_peer(&state).await;

        let snap = state.join(a, "r1".into(), "alice".into()).await.unwrap();
        assert_eq!(snap.others, vec![]);
        assert!(snap.newly_joined);

        let snap = state.join(b, "r1".into(), "bob".into()).await.unwrap();
        assert_eq!(snap.others, vec![a]);

        let snap = state.join(c, "r1".into(), "carol".into()).await.unwrap();
        assert_eq!(snap.others, vec![a, b]);
        assert_eq!(state.members_of(&"r1".into()).await, vec![a, b, c]);
    }

    #[tokio::test]
    async fn duplicate_join_is_a_noop_returning_the_same_snapshot() {
        let state = ServerState::new();
        let (a, _rx_a) = registered_peer(&state).await;
        let (b, _rx_b) = registered_peer(&state).await;
        let _ = state.join(a, "r1".into(), "alice".into()).await.unwrap();
        let _ = state.join(b, "r1".into(), "bob".into()).await.unwrap();

        // Second join, even to a different room, leaves membership alone.
        let snap = state.join(b, "r2".into(), "bob".into()).await.unwrap();
        assert_eq!(snap.room, "r1".into());
        assert_eq!(snap.others, vec![a]);
        assert!(!snap.newly_joined);
        assert!(state.members_of(&"r2".into()).await.is_empty());
    }

    #[tokio::test]
    async fn join_requires_a_registered_peer() {
        let state = ServerState::new();
        assert!(matches!(
            state.join(PeerId::random(), "r1".into(), "ghost".into()).await,
            Err(SignalingError::UnknownPeer)
        ));
    }

    #[tokio::test]
    async fn leave_empties_and_removes_the_room() {
        let state = ServerState::new();
        let (a, _rx_a) = registered_peer(&state).await;
        let (b, _rx_b) = registered_peer(&state).await;
        let _ = state.join(a, "r1".into(), "alice".into()).await.unwrap();
        let _ = state.join(b, "r1".into(), "bob".into()).await.unwrap();

        assert_eq!(state.leave(b).await, Some("r1".into()));
        assert_eq!(state.members_of(&"r1".into()).await, vec![a]);

        assert_eq!(state.leave(a).await, Some("r1".into()));
        assert!(state.members_of(&"r1".into()).await.is_empty());

        // Leaving again finds no room.
        assert_eq!(state.leave(a).await, None);
    }

    #[tokio::test]
    async fn registry_and_directory_agree() {
        let state = ServerState::new();
        let (a, _rx_a) = registered_peer(&state).await;
        let (b, _rx_b) = registered_peer(&state).await;
        let _ = state.join(a, "r1".into(), "alice".into()).await.unwrap();
        let _ = state.join(b, "r2".into(), "bob".into()).await.unwrap();

        for (peer, room) in [(a, RoomId::from("r1")), (b, RoomId::from("r2"))] {
            assert_eq!(state.lookup(peer).await.unwrap().room, Some(room.clone()));
            assert!(state.members_of(&room).await.contains(&peer));
        }

        let _ = state.leave(a).await;
        assert_eq!(state.lookup(a).await.unwrap().room, None);
        assert!(!state.members_of(&"r1".into()).await.contains(&a));
    }

    #[tokio::test]
    async fn unregister_strips_membership_without_leave() {
        let state = ServerState::new();
        let (a, _rx_a) = registered_peer(&state).await;
        let (b, _rx_b) = registered_peer(&state).await;
        let _ = state.join(a, "r1".into(), "alice".into()).await.unwrap();
        let _ = state.join(b, "r1".into(), "bob".into()).await.unwrap();

        state.unregister(a).await;
        assert_eq!(state.members_of(&"r1".into()).await, vec![b]);
    }

    #[tokio::test]
    async fn join_records_the_display_name() {
        let state = ServerState::new();
        let (a, _rx_a) = registered_peer(&state).await;
        let _ = state.join(a, "r1".into(), "alice".into()).await.unwrap();
        assert_eq!(
            state.lookup(a).await.unwrap().username.as_deref(),
            Some("alice")
        );
    }
}
