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

use peerchat_types::Identity;
use thiserror::Error;

/// Failures reported by a [`SignalingRelay`](crate::SignalingRelay).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// The relay could not be reached or dropped the connection.
    #[error("relay unavailable: {0}")]
    Unavailable(String),

    /// The requested identity is not registered with the relay.
    #[error("peer '{0}' is not available")]
    PeerUnavailable(Identity),

    /// Another endpoint already holds this identity.
    #[error("identity '{0}' is already taken")]
    IdTaken(Identity),

    /// An operation needed a registered identity.
    #[error("not registered with the relay")]
    NotRegistered,

    /// The relay reported an error of its own.
    #[error("relay error: {0}")]
    Server(String),
}

/// Failures of a single [`PeerLink`](crate::PeerLink).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("link is closed")]
    Closed,

    #[error("link send failed: {0}")]
    Send(String),
}
