//! Error types for the signaling relay.

use huddle_protocol::PeerId;
use thiserror::Error;

/// Errors that can occur while mutating relay state.
#[derive(Error, Debug)]
pub enum SignalingError {
    /// A peer ID was registered twice. Cannot happen under correct
    /// transport usage; surfaced instead of silently overwriting the
    /// first connection's outbound channel.
    #[error("peer {0} is already registered")]
    AlreadyRegistered(PeerId),

    /// Operation referenced a peer that is not registered.
    #[error("unknown peer")]
    UnknownPeer,
}

/// Errors from a single inbound client frame.
///
/// None of these are fatal to the relay; the frame is dropped and the
/// connection keeps running (or, for [`Close`](Self::Close), winds down).
#[derive(Error, Debug)]
pub enum ClientRequestError {
    /// Connection was closed
    #[error("connection closed")]
    Close,

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unsupported message type (binary frames are not part of the protocol)
    #[error("unsupported message type")]
    UnsupportedType,
}
