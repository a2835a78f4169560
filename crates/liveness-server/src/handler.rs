//! Inbound frame classification.

use axum::extract::ws::Message;

/// What the session should do with one inbound frame.
#[derive(Debug)]
pub enum Inbound {
    /// Application data; send the reply back and count it as activity.
    Data(Message),
    /// Answer to one of our probes.
    ProbeAck,
    /// Peer-initiated ping. Counts as activity; axum answers it.
    PeerPing,
    /// The peer asked to close.
    Close,
}

/// Classify an inbound frame. Text and binary payloads are echoed verbatim.
pub fn classify(msg: Message) -> Inbound {
    match msg {
        Message::Text(_) | Message::Binary(_) => Inbound::Data(msg),
        Message::Pong(_) => Inbound::ProbeAck,
        Message::Ping(_) => Inbound::PeerPing,
        Message::Close(_) => Inbound::Close,
    }
}
