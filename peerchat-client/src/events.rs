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

use crate::lifecycle::LifecycleState;
use peerchat_types::{ChatMessage, Identity};

/// Handle for one pending Error-to-Disconnected reset.
///
/// Every entry into `Error` issues a fresh ticket. A ticket from an earlier
/// episode no longer matches and is ignored when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResetTicket(pub(crate) u64);

/// Client events for UI consumption.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The relay confirmed our identity.
    IdentityAssigned(Identity),
    /// Registration with the relay failed. The identity stays pending.
    RegistrationFailed(String),
    StateChanged {
        from: LifecycleState,
        to: LifecycleState,
    },
    /// A connection attempt failed. The client sits in `Error` until `reset`
    /// is delivered back to the controller.
    ConnectionFailed { reason: String, reset: ResetTicket },
    /// A second party tried to connect while we were busy and was closed.
    InboundRejected(Identity),
    MessageAppended(ChatMessage),
    MessagesCleared,
}
