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

//! The relay and link seams.

use crate::error::{RelayError, TransportError};
use crate::event::{EventSink, LinkId};
use peerchat_types::Identity;

/// One data link to a remote party.
///
/// Dropping a link does not close it; owners call [`close`](Self::close)
/// explicitly when they tear a session down.
pub trait PeerLink: Send + 'static {
    fn id(&self) -> LinkId;

    /// The identity on the other end.
    fn remote(&self) -> &Identity;

    /// Queue a payload for delivery. Fire-and-forget: `Ok` means the payload
    /// was handed to the transport, not that the remote party received it.
    fn send(&self, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Close the link and notify the remote party. Closing twice is harmless.
    fn close(&mut self);
}

/// An external signaling relay that locates endpoints by identity.
pub trait SignalingRelay: Send + 'static {
    type Link: PeerLink;

    /// Register `identity` and start reporting into `events`. Success of the
    /// registration itself is reported as
    /// [`TransportEvent::Registered`](crate::TransportEvent::Registered).
    fn register(
        &mut self,
        identity: &Identity,
        events: EventSink<Self::Link>,
    ) -> Result<(), RelayError>;

    /// Ask the relay for a new link to `remote`. The link reports
    /// [`LinkEvent::Open`](crate::LinkEvent::Open) once usable; an unreachable
    /// peer may be reported later as a relay error.
    fn connect(&mut self, remote: &Identity) -> Result<Self::Link, RelayError>;

    /// Withdraw the registration. Further events are not delivered.
    fn shutdown(&mut self);
}
