//! Wire protocol shared by the huddle signaling relay and its clients.
//!
//! Every frame on the wire is a JSON envelope with an event name and a
//! payload:
//!
//! ```json
//! {"type": "joinRoom", "data": {"room": "standup", "username": "alice"}}
//! ```
//!
//! [`ClientEvent`] enumerates everything a client may send to the relay,
//! [`ServerEvent`] everything the relay may send back. Session descriptions,
//! ICE candidates and chat timestamps are carried as opaque JSON values; the
//! relay forwards them without interpretation.

#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Unique identifier for a connected peer, assigned by the relay at connect
/// time and stable for the lifetime of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub Uuid);

impl PeerId {
    /// Generate a fresh random peer ID.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PeerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Room identifier, supplied by the first joiner.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Media track kind for mute/unmute notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

/// A chat message, relayed to the whole room unmodified (sender included).
///
/// The timestamp is whatever the sending client put there; the relay does
/// not parse or rewrite it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub room: RoomId,
    pub user: String,
    pub message: String,
    pub timestamp: Value,
}

/// Events sent from a client to the relay.
///
/// Directed events (`offer`, `answer`, `candidate`, status requests) name
/// their target peer; room events name the room. The relay stamps the
/// sender's ID onto forwarded events, so clients never claim an identity
/// themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Enter a room, creating it if it does not exist yet.
    JoinRoom { room: RoomId, username: String },
    /// Chat message, broadcast to the whole room including the sender.
    SendMessage(ChatMessage),
    /// Announce a call to the rest of the room. Payload is the bare room id.
    StartSharing(RoomId),
    /// SDP offer for one peer.
    Offer { to: PeerId, description: Value },
    /// SDP answer for one peer.
    Answer { to: PeerId, description: Value },
    /// ICE candidate for one peer.
    Candidate { to: PeerId, candidate: Value },
    /// Camera toggled; directed when `to` is set, room broadcast otherwise.
    #[serde(rename_all = "camelCase")]
    CameraStatusChange {
        room: RoomId,
        is_on: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<PeerId>,
    },
    /// Generalized audio/video mute state change, room broadcast.
    #[serde(rename_all = "camelCase")]
    MediaStatusChanged {
        room: RoomId,
        media_type: MediaKind,
        is_enabled: bool,
    },
    /// Ask one peer to report its camera state.
    RequestUserStatus { to: PeerId, from: PeerId },
    /// Reply to a status request with the actual reported state.
    #[serde(rename_all = "camelCase")]
    UserStatus { to: PeerId, is_camera_on: bool },
    /// Ask one peer to (re)send a fresh offer.
    RequestOffer { to: PeerId, from: PeerId },
    /// Screen sharing started or stopped, room broadcast.
    #[serde(rename_all = "camelCase")]
    ScreenShare { room: RoomId, is_sharing: bool },
}

impl FromStr for ClientEvent {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

impl fmt::Display for ClientEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serde_json::to_string(self).map_err(|_| fmt::Error)?)
    }
}

/// Events sent from the relay to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Snapshot of the other members already in the room, sent once to a
    /// joiner.
    CurrentUsers(Vec<PeerId>),
    /// A new peer entered the room.
    UserJoined(PeerId),
    /// A peer left the room or disconnected.
    UserLeft(PeerId),
    /// Chat message, identical payload to the inbound `sendMessage`.
    ReceiveMessage(ChatMessage),
    /// A peer wants to start a call; carries that peer's id.
    StartCall(PeerId),
    /// SDP offer forwarded from `from`.
    Offer { from: PeerId, description: Value },
    /// SDP answer forwarded from `from`.
    Answer { from: PeerId, description: Value },
    /// ICE candidate forwarded from `from`.
    Candidate { from: PeerId, candidate: Value },
    #[serde(rename_all = "camelCase")]
    CameraStatusChange { user_id: PeerId, is_on: bool },
    #[serde(rename_all = "camelCase")]
    MediaStatusChanged {
        user_id: PeerId,
        media_type: MediaKind,
        is_enabled: bool,
    },
    #[serde(rename_all = "camelCase")]
    ScreenShare { user_id: PeerId, is_sharing: bool },
    /// A peer asks the recipient to report its camera state.
    RequestUserStatus { from: PeerId },
    #[serde(rename_all = "camelCase")]
    UserStatus { from: PeerId, is_camera_on: bool },
    /// A peer asks the recipient to send a fresh offer.
    RequestOffer { from: PeerId },
}

impl FromStr for ServerEvent {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

impl fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serde_json::to_string(self).map_err(|_| fmt::Error)?)
    }
}
