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

//! In-process signaling relay.
//!
//! [`MemoryHub`] plays the part of the hosted relay for every client created
//! from it, so several clients can talk inside one process. Links open
//! optimistically: both ends receive [`LinkEvent::Open`] as soon as the
//! initiator connects, and a rejecting acceptor simply closes its end.

use crate::error::{RelayError, TransportError};
use crate::event::{EventSink, LinkEvent, LinkId, TransportEvent};
use crate::relay::{PeerLink, SignalingRelay};
use log::{debug, info};
use peerchat_types::Identity;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct HubState {
    peers: HashMap<Identity, EventSink<MemoryLink>>,
    next_link: LinkId,
    offline: bool,
}

impl HubState {
    fn allocate_link(&mut self) -> LinkId {
        self.next_link += 1;
        self.next_link
    }
}

/// Shared relay state. Clone it to hand the same relay to several clients.
#[derive(Debug, Clone, Default)]
pub struct MemoryHub {
    state: Arc<Mutex<HubState>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// A relay endpoint for one client.
    pub fn relay(&self) -> MemoryRelay {
        MemoryRelay {
            hub: self.clone(),
            registration: None,
        }
    }

    /// Simulate the hosted relay going down (`false`) or coming back (`true`).
    /// Registered links keep working; only new registrations and connects fail.
    pub fn set_available(&self, available: bool) {
        self.lock().offline = !available;
    }

    pub fn is_registered(&self, identity: &Identity) -> bool {
        self.lock().peers.contains_key(identity)
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One client's view of a [`MemoryHub`].
#[derive(Debug)]
pub struct MemoryRelay {
    hub: MemoryHub,
    registration: Option<(Identity, EventSink<MemoryLink>)>,
}

impl SignalingRelay for MemoryRelay {
    type Link = MemoryLink;

    fn register(
        &mut self,
        identity: &Identity,
        events: EventSink<MemoryLink>,
    ) -> Result<(), RelayError> {
        let mut hub = self.hub.lock();
        if hub.offline {
            return Err(RelayError::Unavailable("memory relay is offline".into()));
        }
        if hub.peers.contains_key(identity) {
            return Err(RelayError::IdTaken(identity.clone()));
        }
        hub.peers.insert(identity.clone(), events.clone());
        drop(hub);

        info!("memory relay registered {identity}");
        let _ = events.send(TransportEvent::Registered(identity.clone()));
        self.registration = Some((identity.clone(), events));
        Ok(())
    }

    fn connect(&mut self, remote: &Identity) -> Result<MemoryLink, RelayError> {
        let (local, local_sink) = self
            .registration
            .clone()
            .ok_or(RelayError::NotRegistered)?;

        let mut hub = self.hub.lock();
        if hub.offline {
            return Err(RelayError::Unavailable("memory relay is offline".into()));
        }
        let outbound_id = hub.allocate_link();
        let closed = Arc::new(AtomicBool::new(false));

        let Some(remote_sink) = hub.peers.get(remote).cloned() else {
            drop(hub);
            debug!("memory relay: {remote} is not registered");
            closed.store(true, Ordering::Relaxed);
            let _ = local_sink.send(TransportEvent::RelayError(RelayError::PeerUnavailable(
                remote.clone(),
            )));
            return Ok(MemoryLink {
                id: outbound_id,
                remote: remote.clone(),
                peer: None,
                closed,
            });
        };
        let inbound_id = hub.allocate_link();
        drop(hub);

        let inbound = MemoryLink {
            id: inbound_id,
            remote: local.clone(),
            peer: Some(PeerEnd {
                sink: local_sink.clone(),
                link: outbound_id,
            }),
            closed: closed.clone(),
        };
        let _ = remote_sink.send(TransportEvent::Incoming(inbound));
        let _ = remote_sink.send(TransportEvent::Link {
            link: inbound_id,
            event: LinkEvent::Open,
        });
        let _ = local_sink.send(TransportEvent::Link {
            link: outbound_id,
            event: LinkEvent::Open,
        });

        debug!("memory relay linked {local} -> {remote}");
        Ok(MemoryLink {
            id: outbound_id,
            remote: remote.clone(),
            peer: Some(PeerEnd {
                sink: remote_sink,
                link: inbound_id,
            }),
            closed,
        })
    }

    fn shutdown(&mut self) {
        if let Some((identity, _)) = self.registration.take() {
            self.hub.lock().peers.remove(&identity);
            info!("memory relay released {identity}");
        }
    }
}

#[derive(Debug)]
struct PeerEnd {
    sink: EventSink<MemoryLink>,
    link: LinkId,
}

/// One end of an in-process link.
#[derive(Debug)]
pub struct MemoryLink {
    id: LinkId,
    remote: Identity,
    peer: Option<PeerEnd>,
    closed: Arc<AtomicBool>,
}

impl MemoryLink {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    fn notify_peer(&self, event: LinkEvent) -> Result<(), TransportError> {
        let peer = self.peer.as_ref().ok_or(TransportError::Closed)?;
        peer.sink
            .send(TransportEvent::Link {
                link: peer.link,
                event,
            })
            .map_err(|_| TransportError::Closed)
    }
}

impl PeerLink for MemoryLink {
    fn id(&self) -> LinkId {
        self.id
    }

    fn remote(&self) -> &Identity {
        &self.remote
    }

    fn send(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.notify_peer(LinkEvent::Data(payload))
    }

    fn close(&mut self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            let _ = self.notify_peer(LinkEvent::Closed);
        }
    }
}
