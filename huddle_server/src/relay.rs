//! Routing of inbound client events to outbound targets.
//!
//! Two addressing modes cover the whole protocol: *directed* events go to
//! exactly one peer named by the sender, *room* events fan out to the
//! members of a room. Directed sends to a peer that has already
//! disconnected are dropped silently; the target can vanish between
//! discovery and send, and that race is expected rather than exceptional.
//!
//! The dispatcher itself holds no state. Join requests are delegated to
//! [`ServerState::join`]; everything else is a pure read-and-forward.

use huddle_protocol::{ClientEvent, PeerId, RoomId, ServerEvent};
use tracing::{debug, trace};

use crate::state::ServerState;

/// Send one event to one peer, dropping it if the peer is gone.
pub async fn send_to(state: &ServerState, target: PeerId, event: ServerEvent) {
    match state.sender_of(target).await {
        Some(tx) => {
            let _ = tx.send(event);
        }
        None => trace!(%target, "dropping event for unknown peer"),
    }
}

/// Send one event to every member of a room, except `skip` if given.
pub async fn broadcast(
    state: &ServerState,
    room: &RoomId,
    skip: Option<PeerId>,
    event: ServerEvent,
) {
    for (member, tx) in state.room_senders(room).await {
        if Some(member) != skip {
            let _ = tx.send(event.clone());
        }
    }
}

/// Route one inbound event from `sender` per the relay's dispatch table.
pub async fn dispatch(state: &ServerState, sender: PeerId, event: ClientEvent) {
    debug!(%sender, ?event, "dispatching");
    match event {
        ClientEvent::JoinRoom { room, username } => {
            let Ok(snapshot) = state.join(sender, room, username).await else {
                // Sender raced its own disconnect; nothing to do.
                return;
            };
            send_to(state, sender, ServerEvent::CurrentUsers(snapshot.others)).await;
            if snapshot.newly_joined {
                broadcast(
                    state,
                    &snapshot.room,
                    Some(sender),
                    ServerEvent::UserJoined(sender),
                )
                .await;
            }
        }
        ClientEvent::SendMessage(message) => {
            // Chat goes to the whole room, the author included.
            let room = message.room.clone();
            broadcast(state, &room, None, ServerEvent::ReceiveMessage(message)).await;
        }
        ClientEvent::StartSharing(room) => {
            broadcast(state, &room, Some(sender), ServerEvent::StartCall(sender)).await;
        }
        ClientEvent::Offer { to, description } => {
            send_to(
                state,
                to,
                ServerEvent::Offer {
                    from: sender,
                    description,
                },
            )
            .await;
        }
        ClientEvent::Answer { to, description } => {
            send_to(
                state,
                to,
                ServerEvent::Answer {
                    from: sender,
                    description,
                },
            )
            .await;
        }
        ClientEvent::Candidate { to, candidate } => {
            send_to(
                state,
                to,
                ServerEvent::Candidate {
                    from: sender,
                    candidate,
                },
            )
            .await;
        }
        ClientEvent::CameraStatusChange { room, is_on, to } => {
            let event = ServerEvent::CameraStatusChange {
                user_id: sender,
                is_on,
            };
            match to {
                Some(target) => send_to(state, target, event).await,
                None => broadcast(state, &room, Some(sender), event).await,
            }
        }
        ClientEvent::MediaStatusChanged {
            room,
            media_type,
            is_enabled,
        } => {
            broadcast(
                state,
                &room,
                Some(sender),
                ServerEvent::MediaStatusChanged {
                    user_id: sender,
                    media_type,
                    is_enabled,
                },
            )
            .await;
        }
        ClientEvent::RequestUserStatus { to, from } => {
            send_to(state, to, ServerEvent::RequestUserStatus { from }).await;
        }
        ClientEvent::UserStatus { to, is_camera_on } => {
            // Replies carry the responder's actual reported state.
            send_to(
                state,
                to,
                ServerEvent::UserStatus {
                    from: sender,
                    is_camera_on,
                },
            )
            .await;
        }
        ClientEvent::RequestOffer { to, from } => {
            send_to(state, to, ServerEvent::RequestOffer { from }).await;
        }
        ClientEvent::ScreenShare { room, is_sharing } => {
            broadcast(
                state,
                &room,
                Some(sender),
                ServerEvent::ScreenShare {
                    user_id: sender,
                    is_sharing,
                },
            )
            .await;
        }
    }
}
