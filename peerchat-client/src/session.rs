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

use peerchat_transport::{LinkId, PeerLink, TransportError};
use peerchat_types::Identity;
use std::fmt;

/// Which side opened the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

/// The one live link to a remote party. At most one exists per client.
///
/// Events from the transport are bound to a session by its link id; once the
/// session is closed, events still in flight for that id are ignored.
pub struct Session<L: PeerLink> {
    link: L,
    remote: Identity,
    direction: Direction,
}

impl<L: PeerLink> Session<L> {
    pub fn new(link: L, direction: Direction) -> Self {
        let remote = link.remote().clone();
        Self {
            link,
            remote,
            direction,
        }
    }

    pub fn remote(&self) -> &Identity {
        &self.remote
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn link_id(&self) -> LinkId {
        self.link.id()
    }

    pub fn send(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        self.link.send(payload)
    }

    pub fn close(mut self) {
        self.link.close();
    }
}

impl<L: PeerLink> fmt::Debug for Session<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("link", &self.link.id())
            .field("remote", &self.remote)
            .field("direction", &self.direction)
            .finish()
    }
}
