//! Room-based signaling relay for WebRTC peer-to-peer audio/video/chat.
//!
//! The relay never touches media. It keeps a registry of live WebSocket
//! connections and a directory of named rooms, and forwards the handshake
//! traffic (session descriptions, ICE candidates, presence and media-state
//! events) browser peers need to negotiate direct sessions with each other.
//! All state is in memory and lost on restart.
//!
//! # Protocol
//!
//! Clients connect to **`GET /ws`** and exchange JSON frames of the form
//! `{"type": ..., "data": ...}` (see [`huddle_protocol`]). A typical
//! session:
//!
//! ```json
//! {"type": "joinRoom", "data": {"room": "standup", "username": "alice"}}
//! ```
//!
//! The joiner receives a `currentUsers` snapshot of who is already in the
//! room, the room receives `userJoined`, and from there peers negotiate
//! directly via relayed `offer` / `answer` / `candidate` events addressed
//! by peer ID. Chat (`sendMessage`) and presence changes (`screenShare`,
//! `cameraStatusChange`, `mediaStatusChanged`) fan out to the room. A
//! disconnect vacates the peer's room and emits `userLeft` to whoever is
//! left.
//!
//! **`GET /health`** answers a static liveness string.
//!
//! # Example
//!
//! ```bash
//! # Start the relay (defaults to port 5000, override with --port or PORT)
//! huddle-signaling --port 5000
//!
//! # Probe liveness
//! curl http://127.0.0.1:5000/health
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod handler;
pub mod relay;
pub mod state;

pub use error::{ClientRequestError, SignalingError};
pub use handler::router;
pub use state::ServerState;
