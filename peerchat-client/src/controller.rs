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

//! The connection lifecycle controller.
//!
//! [`ChatController`] is a synchronous state machine. Transport events and
//! user intents are applied one at a time, run to completion, and leave a
//! queue of [`ClientEvent`]s behind for the caller to publish. Nothing in
//! here blocks or spawns; timers are the caller's business (see
//! [`ResetTicket`]).

use crate::error::IntentError;
use crate::events::{ClientEvent, ResetTicket};
use crate::lifecycle::{LifecycleState, RegistrationStatus};
use crate::session::{Direction, Session};
use crate::store::MessageStore;
use log::{debug, error, info, warn};
use peerchat_transport::{
    EventSink, LinkEvents, LinkId, PeerLink, RelayError, SignalingRelay, TransportEvent,
};
use peerchat_types::{ChatMessage, Identity};
use std::time::Duration;

/// How long the client stays in `Error` before returning to `Disconnected`.
pub const ERROR_RESET_DELAY: Duration = Duration::from_secs(3);

pub struct ChatController<R: SignalingRelay> {
    relay: R,
    events: EventSink<R::Link>,
    pending_identity: Option<Identity>,
    identity: Option<Identity>,
    registration: RegistrationStatus,
    session: Option<Session<R::Link>>,
    state: LifecycleState,
    store: MessageStore,
    error_episode: u64,
    outbox: Vec<ClientEvent>,
}

impl<R: SignalingRelay> ChatController<R> {
    /// `events` is the sink the relay and its links report into. The owner
    /// of the matching stream feeds every event back through
    /// [`handle_event`](Self::handle_event).
    pub fn new(relay: R, events: EventSink<R::Link>) -> Self {
        Self {
            relay,
            events,
            pending_identity: None,
            identity: None,
            registration: RegistrationStatus::Pending,
            session: None,
            state: LifecycleState::Disconnected,
            store: MessageStore::new(),
            error_episode: 0,
            outbox: Vec::new(),
        }
    }

    /// Generate an identity and register it with the relay.
    ///
    /// The identity becomes visible once the relay confirms it. Calling this
    /// again after success is a no-op; after a failure it tries again with a
    /// fresh identity.
    pub fn startup(&mut self) -> Result<(), RelayError> {
        if self.identity.is_some() || self.pending_identity.is_some() {
            debug!("startup called twice, ignoring");
            return Ok(());
        }
        let identity = Identity::generate();
        info!("registering as {identity}");
        match self.relay.register(&identity, self.events.clone()) {
            Ok(()) => {
                self.pending_identity = Some(identity);
                self.registration = RegistrationStatus::Pending;
                Ok(())
            }
            Err(e) => {
                error!("registration failed: {e}");
                self.registration_failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Apply one event from the transport.
    pub fn handle_event(&mut self, event: TransportEvent<R::Link>) {
        match event {
            TransportEvent::Registered(identity) => self.on_registered(identity),
            TransportEvent::RelayError(e) => self.on_relay_error(e),
            TransportEvent::Incoming(link) => self.accept_inbound(link),
            TransportEvent::Link { link, event } => event.dispatch(link, self),
        }
    }

    /// A remote party opened a link to us. First connection wins: the link
    /// is closed immediately unless we are idle.
    pub fn accept_inbound(&mut self, mut link: R::Link) {
        let remote = link.remote().clone();
        if self.session.is_some() || !self.state.can_start_connection() {
            info!("rejecting inbound link from {remote} while {}", self.state);
            link.close();
            self.emit(ClientEvent::InboundRejected(remote));
            return;
        }
        info!("accepting inbound link from {remote}");
        self.begin_session(link, Direction::Inbound);
    }

    /// User intent: connect to the identity in `target` (surrounding
    /// whitespace ignored).
    ///
    /// A failure to even start the attempt is reported like any later
    /// transport failure: the client passes through `Connecting` into
    /// `Error`.
    pub fn connect_outbound(&mut self, target: &str) -> Result<(), IntentError> {
        let remote = Identity::parse(target).ok_or(IntentError::EmptyTarget)?;
        if self.session.is_some() || !self.state.can_start_connection() {
            return Err(IntentError::Busy(self.state));
        }
        if self.identity.is_none() {
            return Err(IntentError::NotRegistered);
        }

        info!("connecting to {remote}");
        match self.relay.connect(&remote) {
            Ok(link) => self.begin_session(link, Direction::Outbound),
            Err(e) => {
                self.transition(LifecycleState::Connecting);
                self.on_transport_error(&e.to_string());
            }
        }
        Ok(())
    }

    /// Close the session, if any, and return to `Disconnected`.
    ///
    /// Idempotent. Also the common path for remote close and link errors,
    /// and it cuts a pending Error reset short.
    pub fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            info!("closing session with {}", session.remote());
            session.close();
        }
        if self.state != LifecycleState::Disconnected {
            self.transition(LifecycleState::Disconnected);
        }
    }

    /// User intent: send `text` to the connected party.
    ///
    /// The message is appended locally even if the transport refuses it;
    /// delivery is fire-and-forget.
    pub fn send(&mut self, text: &str) -> Result<ChatMessage, IntentError> {
        if self.state != LifecycleState::Connected {
            return Err(IntentError::NotConnected);
        }
        let session = self.session.as_ref().ok_or(IntentError::NotConnected)?;
        let sender = self.identity.clone().ok_or(IntentError::NotRegistered)?;

        let message = ChatMessage::outgoing(sender, text);
        match message.encode() {
            Ok(payload) => {
                if let Err(e) = session.send(payload) {
                    warn!("message to {} not delivered: {e}", session.remote());
                }
            }
            Err(e) => warn!("could not encode message: {e}"),
        }
        self.append(message.clone());
        Ok(message)
    }

    /// A connection attempt failed. Only meaningful while `Connecting`;
    /// otherwise the error is logged and ignored.
    pub fn on_transport_error(&mut self, reason: &str) {
        if self.state != LifecycleState::Connecting {
            warn!("transport error while {}: {reason}", self.state);
            return;
        }
        error!("connection attempt failed: {reason}");
        if let Some(session) = self.session.take() {
            session.close();
        }
        self.transition(LifecycleState::Error);
        self.error_episode += 1;
        self.emit(ClientEvent::ConnectionFailed {
            reason: reason.to_string(),
            reset: ResetTicket(self.error_episode),
        });
    }

    /// The reset timer for `ticket` fired.
    pub fn on_error_timeout(&mut self, ticket: ResetTicket) {
        if self.state != LifecycleState::Error || ticket.0 != self.error_episode {
            debug!("stale error reset ignored");
            return;
        }
        self.transition(LifecycleState::Disconnected);
    }

    /// Tear down the session and withdraw from the relay.
    pub fn shutdown(&mut self) {
        self.disconnect();
        self.relay.shutdown();
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// `None` until the relay confirms registration.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn registration(&self) -> &RegistrationStatus {
        &self.registration
    }

    pub fn remote(&self) -> Option<&Identity> {
        self.session.as_ref().map(Session::remote)
    }

    pub fn session(&self) -> Option<&Session<R::Link>> {
        self.session.as_ref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.store.messages()
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Take the events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<ClientEvent> {
        std::mem::take(&mut self.outbox)
    }

    fn on_registered(&mut self, identity: Identity) {
        match self.pending_identity.take() {
            Some(pending) if pending != identity => {
                warn!("relay confirmed {identity}, expected {pending}")
            }
            None if self.identity.is_some() => {
                debug!("duplicate registration confirmation for {identity}");
                return;
            }
            _ => {}
        }
        info!("registered as {identity}");
        self.identity = Some(identity.clone());
        self.registration = RegistrationStatus::Registered;
        self.emit(ClientEvent::IdentityAssigned(identity));
    }

    fn on_relay_error(&mut self, e: RelayError) {
        if self.identity.is_none() {
            if let Some(pending) = self.pending_identity.take() {
                error!("relay refused {pending}: {e}");
                self.registration_failed(e.to_string());
                return;
            }
        }
        self.on_transport_error(&e.to_string());
    }

    fn registration_failed(&mut self, reason: String) {
        self.registration = RegistrationStatus::Failed(reason.clone());
        self.emit(ClientEvent::RegistrationFailed(reason));
    }

    fn begin_session(&mut self, link: R::Link, direction: Direction) {
        let session = Session::new(link, direction);
        debug!(
            "session with {} on link {} ({direction:?})",
            session.remote(),
            session.link_id()
        );
        self.session = Some(session);
        self.transition(LifecycleState::Connecting);
    }

    fn is_current(&self, link: LinkId) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.link_id() == link)
    }

    fn transition(&mut self, next: LifecycleState) -> bool {
        let from = self.state;
        if !from.can_transition_to(next) {
            warn!("ignoring invalid transition {from} -> {next}");
            return false;
        }
        debug!("lifecycle {from} -> {next}");
        self.state = next;
        self.emit(ClientEvent::StateChanged { from, to: next });
        if next == LifecycleState::Disconnected {
            self.store.clear();
            self.emit(ClientEvent::MessagesCleared);
        }
        true
    }

    fn append(&mut self, message: ChatMessage) {
        self.store.append(message.clone());
        self.emit(ClientEvent::MessageAppended(message));
    }

    fn emit(&mut self, event: ClientEvent) {
        self.outbox.push(event);
    }
}

impl<R: SignalingRelay> LinkEvents for ChatController<R> {
    fn on_open(&mut self, link: LinkId) {
        if !self.is_current(link) {
            debug!("open on stale link {link} ignored");
            return;
        }
        if self.state != LifecycleState::Connecting {
            warn!("link {link} opened while {}", self.state);
            return;
        }
        if let Some(remote) = self.remote() {
            info!("connected to {remote}");
        }
        self.transition(LifecycleState::Connected);
    }

    fn on_data(&mut self, link: LinkId, payload: Vec<u8>) {
        if !self.is_current(link) {
            debug!("data on stale link {link} ignored");
            return;
        }
        match ChatMessage::decode_remote(&payload) {
            Ok(message) => self.append(message),
            Err(e) => warn!("dropping undecodable payload on link {link}: {e}"),
        }
    }

    fn on_close(&mut self, link: LinkId) {
        if !self.is_current(link) {
            debug!("close on stale link {link} ignored");
            return;
        }
        info!("link {link} closed by remote");
        self.disconnect();
    }

    fn on_error(&mut self, link: LinkId, reason: String) {
        if !self.is_current(link) {
            debug!("error on stale link {link} ignored: {reason}");
            return;
        }
        warn!("link {link} failed: {reason}");
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerchat_transport::{event_channel, EventStream, MemoryHub, MemoryLink, MemoryRelay};
    use LifecycleState::*;

    struct Peer {
        controller: ChatController<MemoryRelay>,
        stream: EventStream<MemoryLink>,
    }

    impl Peer {
        fn unregistered(hub: &MemoryHub) -> Self {
            let (sink, stream) = event_channel();
            Self {
                controller: ChatController::new(hub.relay(), sink),
                stream,
            }
        }

        fn start(hub: &MemoryHub) -> Self {
            let mut peer = Self::unregistered(hub);
            peer.controller.startup().unwrap();
            peer.pump();
            peer.controller.drain_events();
            peer
        }

        fn pump(&mut self) -> usize {
            let mut handled = 0;
            while let Ok(event) = self.stream.try_recv() {
                self.controller.handle_event(event);
                handled += 1;
            }
            handled
        }

        fn id(&self) -> Identity {
            self.controller.identity().cloned().unwrap()
        }

        fn texts(&self) -> Vec<&str> {
            self.controller.messages().iter().map(|m| m.text()).collect()
        }
    }

    fn settle(peers: &mut [&mut Peer]) {
        loop {
            let handled: usize = peers.iter_mut().map(|peer| peer.pump()).sum();
            if handled == 0 {
                break;
            }
        }
    }

    fn transitions(events: &[ClientEvent]) -> Vec<LifecycleState> {
        events
            .iter()
            .filter_map(|event| match event {
                ClientEvent::StateChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }

    fn connected_pair(hub: &MemoryHub) -> (Peer, Peer) {
        let mut alice = Peer::start(hub);
        let mut bob = Peer::start(hub);
        bob.controller
            .connect_outbound(alice.id().as_str())
            .unwrap();
        settle(&mut [&mut alice, &mut bob]);
        assert_eq!(alice.controller.state(), Connected);
        assert_eq!(bob.controller.state(), Connected);
        alice.controller.drain_events();
        bob.controller.drain_events();
        (alice, bob)
    }

    fn reset_ticket(events: &[ClientEvent]) -> ResetTicket {
        events
            .iter()
            .find_map(|event| match event {
                ClientEvent::ConnectionFailed { reset, .. } => Some(*reset),
                _ => None,
            })
            .expect("no ConnectionFailed event")
    }

    #[test]
    fn test_identity_pending_until_relay_confirms() {
        let hub = MemoryHub::new();
        let mut peer = Peer::unregistered(&hub);
        peer.controller.startup().unwrap();
        assert!(peer.controller.identity().is_none());
        assert_eq!(peer.controller.registration(), &RegistrationStatus::Pending);

        peer.pump();
        assert_eq!(peer.controller.registration(), &RegistrationStatus::Registered);
        let identity = peer.id();
        assert!(identity.as_str().starts_with("user-"));
        assert!(hub.is_registered(&identity));
        assert_eq!(
            peer.controller.drain_events(),
            vec![ClientEvent::IdentityAssigned(identity)]
        );
        assert_eq!(peer.controller.state(), Disconnected);
    }

    #[test]
    fn test_registration_failure_leaves_identity_pending() {
        let hub = MemoryHub::new();
        hub.set_available(false);
        let mut peer = Peer::unregistered(&hub);

        assert!(peer.controller.startup().is_err());
        peer.pump();
        assert!(peer.controller.identity().is_none());
        assert!(peer.controller.registration().is_failed());
        assert!(matches!(
            peer.controller.drain_events().as_slice(),
            [ClientEvent::RegistrationFailed(_)]
        ));
        assert_eq!(
            peer.controller.connect_outbound("user-1111-x"),
            Err(IntentError::NotRegistered)
        );
    }

    #[test]
    fn test_relay_refusal_while_pending_marks_registration_failed() {
        let hub = MemoryHub::new();
        let mut peer = Peer::unregistered(&hub);
        peer.controller.startup().unwrap();

        peer.controller
            .handle_event(TransportEvent::RelayError(RelayError::Server("invalid key".into())));
        assert_eq!(
            peer.controller.registration(),
            &RegistrationStatus::Failed("relay error: invalid key".into())
        );
        assert!(peer.controller.identity().is_none());
        assert_eq!(peer.controller.state(), Disconnected);
    }

    #[test]
    fn test_outbound_connect_reaches_connected_on_both_sides() {
        let hub = MemoryHub::new();
        let mut alice = Peer::start(&hub);
        let mut bob = Peer::start(&hub);

        bob.controller
            .connect_outbound(&format!("  {}  ", alice.id()))
            .unwrap();
        assert_eq!(bob.controller.state(), Connecting);
        settle(&mut [&mut alice, &mut bob]);

        assert_eq!(bob.controller.state(), Connected);
        assert_eq!(alice.controller.state(), Connected);
        assert_eq!(bob.controller.remote(), Some(&alice.id()));
        assert_eq!(alice.controller.remote(), Some(&bob.id()));
        assert_eq!(
            bob.controller.session().map(Session::direction),
            Some(Direction::Outbound)
        );
        assert_eq!(
            alice.controller.session().map(Session::direction),
            Some(Direction::Inbound)
        );
        assert_eq!(
            transitions(&bob.controller.drain_events()),
            vec![Connecting, Connected]
        );
        assert_eq!(
            transitions(&alice.controller.drain_events()),
            vec![Connecting, Connected]
        );
    }

    #[test]
    fn test_messages_flow_in_order_with_origins() {
        let hub = MemoryHub::new();
        let (mut alice, mut bob) = connected_pair(&hub);

        let sent = bob.controller.send("hello").unwrap();
        assert!(sent.is_local());
        assert_eq!(sent.sender_id(), &bob.id());
        settle(&mut [&mut alice, &mut bob]);
        alice.controller.send("hi bob").unwrap();
        settle(&mut [&mut alice, &mut bob]);
        bob.controller.send("how are you?").unwrap();
        settle(&mut [&mut alice, &mut bob]);

        assert_eq!(bob.texts(), ["hello", "hi bob", "how are you?"]);
        assert_eq!(alice.texts(), ["hello", "hi bob", "how are you?"]);

        let received = &alice.controller.messages()[0];
        assert!(!received.is_local());
        assert_eq!(received.sender_id(), &bob.id());
        assert_eq!(received.id(), sent.id());
        assert_eq!(received.timestamp(), sent.timestamp());
        assert!(alice.controller.messages()[1].is_local());
    }

    #[test]
    fn test_disconnect_clears_store_on_both_sides() {
        let hub = MemoryHub::new();
        let (mut alice, mut bob) = connected_pair(&hub);
        bob.controller.send("hello").unwrap();
        settle(&mut [&mut alice, &mut bob]);
        assert_eq!(alice.controller.store().len(), 1);

        alice.controller.disconnect();
        assert_eq!(alice.controller.state(), Disconnected);
        assert!(alice.controller.messages().is_empty());
        assert!(alice.controller.remote().is_none());

        settle(&mut [&mut alice, &mut bob]);
        assert_eq!(bob.controller.state(), Disconnected);
        assert!(bob.controller.messages().is_empty());
        assert!(bob
            .controller
            .drain_events()
            .contains(&ClientEvent::MessagesCleared));
    }

    #[test]
    fn test_disconnect_when_idle_is_a_no_op() {
        let hub = MemoryHub::new();
        let mut peer = Peer::start(&hub);
        peer.controller.disconnect();
        peer.controller.disconnect();
        assert_eq!(peer.controller.state(), Disconnected);
        assert!(peer.controller.drain_events().is_empty());
    }

    #[test]
    fn test_first_connection_wins() {
        let hub = MemoryHub::new();
        let (mut alice, mut bob) = connected_pair(&hub);
        let mut carol = Peer::start(&hub);

        carol
            .controller
            .connect_outbound(alice.id().as_str())
            .unwrap();
        settle(&mut [&mut alice, &mut bob, &mut carol]);

        assert_eq!(alice.controller.state(), Connected);
        assert_eq!(alice.controller.remote(), Some(&bob.id()));
        assert_eq!(bob.controller.state(), Connected);
        assert_eq!(carol.controller.state(), Disconnected);
        assert_eq!(
            alice.controller.drain_events(),
            vec![ClientEvent::InboundRejected(carol.id())]
        );

        // The original session is untouched.
        bob.controller.send("still here").unwrap();
        settle(&mut [&mut alice, &mut bob, &mut carol]);
        assert_eq!(alice.texts(), ["still here"]);
    }

    #[test]
    fn test_unknown_peer_enters_error_then_resets() {
        let hub = MemoryHub::new();
        let mut bob = Peer::start(&hub);

        bob.controller.connect_outbound("user-0000-nobody").unwrap();
        bob.pump();
        assert_eq!(bob.controller.state(), Error);
        assert!(bob.controller.session().is_none());

        let events = bob.controller.drain_events();
        assert_eq!(transitions(&events), vec![Connecting, Error]);
        let ticket = reset_ticket(&events);

        assert_eq!(
            bob.controller.connect_outbound("user-0000-nobody"),
            Err(IntentError::Busy(Error))
        );

        bob.controller.on_error_timeout(ticket);
        assert_eq!(bob.controller.state(), Disconnected);
    }

    #[test]
    fn test_relay_refusing_connect_fails_attempt() {
        let hub = MemoryHub::new();
        let mut bob = Peer::start(&hub);
        hub.set_available(false);

        bob.controller.connect_outbound("user-4242-x").unwrap();
        assert_eq!(bob.controller.state(), Error);
        let events = bob.controller.drain_events();
        assert_eq!(transitions(&events), vec![Connecting, Error]);
        assert!(matches!(
            events.last(),
            Some(ClientEvent::ConnectionFailed { .. })
        ));
    }

    #[test]
    fn test_stale_reset_ticket_is_ignored() {
        let hub = MemoryHub::new();
        let mut bob = Peer::start(&hub);

        bob.controller.connect_outbound("user-0000-nobody").unwrap();
        bob.pump();
        let first = reset_ticket(&bob.controller.drain_events());

        // Leaving Error early invalidates the pending reset.
        bob.controller.disconnect();
        assert_eq!(bob.controller.state(), Disconnected);

        bob.controller.connect_outbound("user-0000-nobody").unwrap();
        bob.pump();
        let second = reset_ticket(&bob.controller.drain_events());
        assert_ne!(first, second);

        bob.controller.on_error_timeout(first);
        assert_eq!(bob.controller.state(), Error);
        bob.controller.on_error_timeout(second);
        assert_eq!(bob.controller.state(), Disconnected);
    }

    #[test]
    fn test_connect_rejected_while_busy_or_empty() {
        let hub = MemoryHub::new();
        let alice = Peer::start(&hub);
        let mut bob = Peer::start(&hub);

        assert_eq!(
            bob.controller.connect_outbound("   "),
            Err(IntentError::EmptyTarget)
        );
        assert_eq!(bob.controller.state(), Disconnected);

        bob.controller
            .connect_outbound(alice.id().as_str())
            .unwrap();
        assert_eq!(
            bob.controller.connect_outbound(alice.id().as_str()),
            Err(IntentError::Busy(Connecting))
        );
        bob.pump();
        assert_eq!(
            bob.controller.connect_outbound(alice.id().as_str()),
            Err(IntentError::Busy(Connected))
        );
    }

    #[test]
    fn test_send_requires_connected_state() {
        let hub = MemoryHub::new();
        let mut alice = Peer::start(&hub);
        let mut bob = Peer::start(&hub);

        assert_eq!(bob.controller.send("early"), Err(IntentError::NotConnected));

        // Still Connecting: bob has not processed the open event yet.
        bob.controller
            .connect_outbound(alice.id().as_str())
            .unwrap();
        assert_eq!(bob.controller.send("early"), Err(IntentError::NotConnected));
        assert!(bob.controller.messages().is_empty());

        alice.pump();
        assert!(alice.controller.messages().is_empty());
    }

    #[test]
    fn test_remote_payload_is_never_local() {
        let hub = MemoryHub::new();
        let (mut alice, bob) = connected_pair(&hub);
        let link = alice.controller.session().map(Session::link_id).unwrap();

        let forged = ChatMessage::outgoing(bob.id(), "claims to be mine")
            .encode()
            .unwrap();
        alice.controller.on_data(link, forged);

        let stored = alice.controller.store().last().unwrap();
        assert!(!stored.is_local());
        assert_eq!(stored.text(), "claims to be mine");
    }

    #[test]
    fn test_malformed_payload_is_dropped() {
        let hub = MemoryHub::new();
        let (mut alice, _bob) = connected_pair(&hub);
        let link = alice.controller.session().map(Session::link_id).unwrap();

        alice.controller.on_data(link, b"not json".to_vec());
        alice.controller.on_data(link, br#"{"text":"no id"}"#.to_vec());

        assert!(alice.controller.messages().is_empty());
        assert_eq!(alice.controller.state(), Connected);
        assert!(alice.controller.drain_events().is_empty());
    }

    #[test]
    fn test_events_from_closed_link_are_ignored() {
        let hub = MemoryHub::new();
        let (mut alice, bob) = connected_pair(&hub);
        let old_link = alice.controller.session().map(Session::link_id).unwrap();

        alice.controller.disconnect();
        alice.controller.drain_events();

        let late = ChatMessage::outgoing(bob.id(), "too late").encode().unwrap();
        alice.controller.on_data(old_link, late);
        alice.controller.on_open(old_link);
        alice.controller.on_close(old_link);

        assert_eq!(alice.controller.state(), Disconnected);
        assert!(alice.controller.messages().is_empty());
        assert!(alice.controller.drain_events().is_empty());
    }

    #[test]
    fn test_link_error_disconnects() {
        let hub = MemoryHub::new();
        let (mut alice, _bob) = connected_pair(&hub);
        let link = alice.controller.session().map(Session::link_id).unwrap();

        alice.controller.on_error(link, "ice failure".into());
        assert_eq!(alice.controller.state(), Disconnected);
        assert!(alice.controller.session().is_none());
    }

    #[test]
    fn test_transport_error_outside_connecting_is_ignored() {
        let hub = MemoryHub::new();
        let (mut alice, _bob) = connected_pair(&hub);

        alice.controller.on_transport_error("relay hiccup");
        assert_eq!(alice.controller.state(), Connected);
        assert!(alice.controller.drain_events().is_empty());
    }

    #[test]
    fn test_can_reconnect_after_disconnect() {
        let hub = MemoryHub::new();
        let (mut alice, mut bob) = connected_pair(&hub);
        bob.controller.disconnect();
        settle(&mut [&mut alice, &mut bob]);
        assert_eq!(alice.controller.state(), Disconnected);

        alice
            .controller
            .connect_outbound(bob.id().as_str())
            .unwrap();
        settle(&mut [&mut alice, &mut bob]);
        assert_eq!(alice.controller.state(), Connected);
        assert_eq!(bob.controller.state(), Connected);
        assert_eq!(
            bob.controller.session().map(Session::direction),
            Some(Direction::Inbound)
        );
    }
}
