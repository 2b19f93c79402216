/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! JSON frames exchanged with a WebSocket signaling relay.
//!
//! The relay speaks PeerJS-style envelopes: `{ "type", "src", "dst", "payload" }`.
//! The client sends `OFFER`, `ANSWER`, `CANDIDATE` and `LEAVE` frames with
//! `dst` set; the relay fills in `src` when forwarding. `OFFER` and `ANSWER`
//! carry a session description, `CANDIDATE` one ICE candidate. The client
//! also sends a bare `HEARTBEAT` to keep the socket alive. The relay itself
//! sends `OPEN` after registration, `ID-TAKEN` or `ERROR` on failure, and
//! `EXPIRE` when an `OFFER` names an unknown peer.
//!
//! No chat payload ever appears in a frame; those travel over the data
//! channel the frames negotiate.

use peerchat_types::Identity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Connection type announced in link-scoped payloads.
pub const DATA_CONNECTION: &str = "data";

/// How payloads are framed on the data channel.
pub const SERIALIZATION: &str = "raw";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum EnvelopeKind {
    Open,
    IdTaken,
    Error,
    Offer,
    Answer,
    Candidate,
    Leave,
    Expire,
    Heartbeat,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    /// `{ "type": "offer" | "answer", "sdp": "..." }`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp: Option<Value>,
    /// `{ "candidate", "sdpMid", "sdpMLineIndex" }`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst: Option<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<EnvelopePayload>,
}

impl Envelope {
    /// A link-scoped frame addressed to `dst`.
    pub fn to_peer(kind: EnvelopeKind, dst: &Identity, connection_id: &str) -> Self {
        Self {
            kind,
            src: None,
            dst: Some(dst.clone()),
            payload: Some(EnvelopePayload {
                connection_id: Some(connection_id.to_string()),
                connection_type: Some(DATA_CONNECTION.to_string()),
                ..Default::default()
            }),
        }
    }

    /// An `OFFER` opening data link `connection_id` with session description `sdp`.
    pub fn offer(dst: &Identity, connection_id: &str, sdp: Value) -> Self {
        let mut envelope = Self::to_peer(EnvelopeKind::Offer, dst, connection_id);
        if let Some(payload) = envelope.payload.as_mut() {
            payload.sdp = Some(sdp);
            payload.label = Some(connection_id.to_string());
            payload.reliable = Some(true);
            payload.serialization = Some(SERIALIZATION.to_string());
        }
        envelope
    }

    pub fn answer(dst: &Identity, connection_id: &str, sdp: Value) -> Self {
        let mut envelope = Self::to_peer(EnvelopeKind::Answer, dst, connection_id);
        if let Some(payload) = envelope.payload.as_mut() {
            payload.sdp = Some(sdp);
        }
        envelope
    }

    pub fn candidate(dst: &Identity, connection_id: &str, candidate: Value) -> Self {
        let mut envelope = Self::to_peer(EnvelopeKind::Candidate, dst, connection_id);
        if let Some(payload) = envelope.payload.as_mut() {
            payload.candidate = Some(candidate);
        }
        envelope
    }

    pub fn heartbeat() -> Self {
        Self {
            kind: EnvelopeKind::Heartbeat,
            src: None,
            dst: None,
            payload: None,
        }
    }

    pub fn connection_id(&self) -> Option<&str> {
        self.payload.as_ref()?.connection_id.as_deref()
    }

    pub fn sdp(&self) -> Option<&Value> {
        self.payload.as_ref()?.sdp.as_ref()
    }

    pub fn ice_candidate(&self) -> Option<&Value> {
        self.payload.as_ref()?.candidate.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.payload.as_ref()?.msg.as_deref()
    }
}
