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

//! Chat messages and their data-link encoding.
//!
//! On the link a message travels as one JSON object,
//! `{ "id", "senderId", "text", "timestamp", "isSelf" }`, with no framing or
//! version field. The receiver never trusts `isSelf`: anything decoded from the
//! link is tagged [`Origin::Remote`].

use crate::clock::now_ms;
use crate::identity::Identity;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Who authored a message, from the local client's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// Written on this client.
    Local,
    /// Received over the data link.
    Remote,
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed chat payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The object exchanged over the data link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub id: String,
    pub sender_id: Identity,
    pub text: String,
    pub timestamp: u64,
    #[serde(default)]
    pub is_self: bool,
}

/// An immutable chat message held in the message store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    id: String,
    sender_id: Identity,
    text: String,
    timestamp: u64,
    origin: Origin,
}

impl ChatMessage {
    /// Build a locally authored message stamped with the current time.
    pub fn outgoing(sender_id: Identity, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            sender_id,
            text: text.into(),
            timestamp: now_ms(),
            origin: Origin::Local,
        }
    }

    /// Accept a message from the link. The origin is always [`Origin::Remote`].
    pub fn received(wire: WireMessage) -> Self {
        Self {
            id: wire.id,
            sender_id: wire.sender_id,
            text: wire.text,
            timestamp: wire.timestamp,
            origin: Origin::Remote,
        }
    }

    /// Decode a link payload into a remote message.
    pub fn decode_remote(payload: &[u8]) -> Result<Self, WireError> {
        let wire: WireMessage = serde_json::from_slice(payload)?;
        Ok(Self::received(wire))
    }

    pub fn to_wire(&self) -> WireMessage {
        WireMessage {
            id: self.id.clone(),
            sender_id: self.sender_id.clone(),
            text: self.text.clone(),
            timestamp: self.timestamp,
            is_self: self.origin == Origin::Local,
        }
    }

    /// Encode for the link.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        Ok(serde_json::to_vec(&self.to_wire())?)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sender_id(&self) -> &Identity {
        &self.sender_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn is_local(&self) -> bool {
        self.origin == Origin::Local
    }
}
