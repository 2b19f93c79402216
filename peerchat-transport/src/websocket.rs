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

//! Signaling relay client over WebSocket, using `tokio-tungstenite`.
//!
//! The relay is addressed as `ws[s]://host[:port]/path`; registration appends
//! the `key`, `id` and `token` query parameters a PeerJS-style server expects.
//! Frames are the JSON [`Envelope`]s described in [`crate::envelope`]. The
//! relay only brokers the offer/answer and ICE candidate exchange; every link
//! it hands out is a [`WebRtcLink`] whose payloads travel over a direct data
//! channel. Links whose data channel is open survive the loss of the relay.
//!
//! # Example
//!
//! ```no_run
//! use peerchat_transport::{event_channel, SignalingRelay, WebSocketRelay};
//! use peerchat_types::Identity;
//!
//! # async fn example() -> Result<(), peerchat_transport::RelayError> {
//! let mut relay = WebSocketRelay::new("ws://localhost:9000/peerchat")?;
//! let (sink, mut events) = event_channel();
//! relay.register(&Identity::generate(), sink)?;
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

use crate::envelope::{Envelope, EnvelopeKind};
use crate::error::RelayError;
use crate::event::{EventSink, LinkEvent, LinkId, TransportEvent};
use crate::relay::SignalingRelay;
use crate::rtc::{LinkHandle, LinkSetup, RemoteSignal, Role, WebRtcConfig, WebRtcLink};
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use peerchat_types::Identity;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

/// API key sent on registration when none is configured.
pub const DEFAULT_KEY: &str = "peerjs";

/// How often the relay connection is kept alive.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Length of the random part of a connection id (`dc_<random>`).
const CONNECTION_ID_LEN: usize = 10;
const TOKEN_LEN: usize = 10;

/// Work for the task that owns the socket.
#[derive(Debug)]
pub(crate) enum Outbound {
    Frame(Envelope),
    /// Forget the link with this connection id.
    Release(String),
    Shutdown,
}

#[derive(Debug, Default)]
struct LinkTableState {
    by_connection: HashMap<String, LinkHandle>,
    next_link: LinkId,
}

/// Maps relay connection ids to live links.
#[derive(Debug, Clone, Default)]
struct LinkTable {
    state: Arc<Mutex<LinkTableState>>,
}

impl LinkTable {
    fn lock(&self) -> MutexGuard<'_, LinkTableState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_id(&self) -> LinkId {
        let mut state = self.lock();
        state.next_link += 1;
        state.next_link
    }

    fn insert(&self, connection_id: &str, handle: LinkHandle) {
        self.lock()
            .by_connection
            .insert(connection_id.to_string(), handle);
    }

    fn contains(&self, connection_id: &str) -> bool {
        self.lock().by_connection.contains_key(connection_id)
    }

    fn get(&self, connection_id: &str) -> Option<LinkHandle> {
        self.lock().by_connection.get(connection_id).cloned()
    }

    fn remove(&self, connection_id: &str) -> Option<LinkHandle> {
        self.lock().by_connection.remove(connection_id)
    }

    fn remove_remote(&self, remote: &Identity) -> Vec<LinkHandle> {
        let mut state = self.lock();
        let gone: Vec<String> = state
            .by_connection
            .iter()
            .filter(|(_, handle)| handle.remote() == remote)
            .map(|(connection_id, _)| connection_id.clone())
            .collect();
        gone.iter()
            .filter_map(|connection_id| state.by_connection.remove(connection_id))
            .collect()
    }

    fn drain(&self) -> Vec<LinkHandle> {
        self.lock().by_connection.drain().map(|(_, handle)| handle).collect()
    }
}

fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn new_connection_id() -> String {
    format!("dc_{}", random_alphanumeric(CONNECTION_ID_LEN))
}

/// What `register` leaves behind for `connect`.
#[derive(Debug)]
struct Registration {
    outbound: mpsc::UnboundedSender<Outbound>,
    events: EventSink<WebRtcLink>,
    runtime: Handle,
}

/// A [`SignalingRelay`] backed by one WebSocket connection to a relay server.
///
/// [`register`](SignalingRelay::register) must be called from within a tokio
/// runtime; it spawns the task that owns the socket.
#[derive(Debug)]
pub struct WebSocketRelay {
    base_url: Url,
    key: String,
    token: String,
    webrtc: Arc<WebRtcConfig>,
    links: LinkTable,
    registration: Option<Registration>,
}

impl WebSocketRelay {
    pub fn new(url: &str) -> Result<Self, RelayError> {
        let base_url = Url::parse(url)
            .map_err(|e| RelayError::Unavailable(format!("invalid relay url '{url}': {e}")))?;
        match base_url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(RelayError::Unavailable(format!(
                    "unsupported relay scheme '{other}'"
                )))
            }
        }
        Ok(Self {
            base_url,
            key: DEFAULT_KEY.to_string(),
            token: random_alphanumeric(TOKEN_LEN),
            webrtc: Arc::new(WebRtcConfig::default()),
            links: LinkTable::default(),
            registration: None,
        })
    }

    /// The API key the relay server expects.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_webrtc(mut self, config: WebRtcConfig) -> Self {
        self.webrtc = Arc::new(config);
        self
    }

    pub fn url(&self) -> &Url {
        &self.base_url
    }

    pub fn webrtc(&self) -> &WebRtcConfig {
        &self.webrtc
    }

    fn registration_url(&self, identity: &Identity) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("key", &self.key)
            .append_pair("id", identity.as_str())
            .append_pair("token", &self.token);
        url
    }
}

impl SignalingRelay for WebSocketRelay {
    type Link = WebRtcLink;

    fn register(
        &mut self,
        identity: &Identity,
        events: EventSink<WebRtcLink>,
    ) -> Result<(), RelayError> {
        if self.registration.is_some() {
            return Err(RelayError::Server("already registered".into()));
        }
        let runtime = Handle::try_current()
            .map_err(|e| RelayError::Unavailable(format!("no tokio runtime: {e}")))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let task = RelayTask {
            url: self.registration_url(identity),
            identity: identity.clone(),
            events: events.clone(),
            links: self.links.clone(),
            outbound: tx.clone(),
            webrtc: self.webrtc.clone(),
        };
        runtime.spawn(task.run(rx));
        self.registration = Some(Registration {
            outbound: tx,
            events,
            runtime,
        });
        Ok(())
    }

    fn connect(&mut self, remote: &Identity) -> Result<WebRtcLink, RelayError> {
        let registration = self.registration.as_ref().ok_or(RelayError::NotRegistered)?;
        if registration.outbound.is_closed() {
            return Err(RelayError::Unavailable("relay connection is closed".into()));
        }
        let connection_id = new_connection_id();
        let (link, handle) = WebRtcLink::start(
            LinkSetup {
                id: self.links.next_id(),
                remote: remote.clone(),
                connection_id: connection_id.clone(),
                role: Role::Offerer,
                config: self.webrtc.clone(),
                events: registration.events.clone(),
                frames: registration.outbound.clone(),
            },
            &registration.runtime,
        );
        self.links.insert(&connection_id, handle);
        debug!("offering {connection_id} to {remote}");
        Ok(link)
    }

    fn shutdown(&mut self) {
        if let Some(registration) = self.registration.take() {
            let _ = registration.outbound.send(Outbound::Shutdown);
        }
    }
}

impl Drop for WebSocketRelay {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct RelayTask {
    url: Url,
    identity: Identity,
    events: EventSink<WebRtcLink>,
    links: LinkTable,
    outbound: mpsc::UnboundedSender<Outbound>,
    webrtc: Arc<WebRtcConfig>,
}

impl RelayTask {
    async fn run(self, mut outbound_rx: mpsc::UnboundedReceiver<Outbound>) {
        info!("connecting to relay {} as {}", self.base(), self.identity);

        let (ws, response) = match tokio_tungstenite::connect_async(self.url.as_str()).await {
            Ok(ok) => ok,
            Err(e) => {
                error!("relay connection to {} failed: {e}", self.base());
                self.emit(TransportEvent::RelayError(RelayError::Unavailable(
                    e.to_string(),
                )));
                return;
            }
        };
        debug!("relay upgrade answered with HTTP {}", response.status());
        let (mut writer, mut reader) = ws.split();
        let mut heartbeat = interval_at(Instant::now() + HEARTBEAT_INTERVAL, HEARTBEAT_INTERVAL);

        loop {
            let frame = tokio::select! {
                outgoing = outbound_rx.recv() => match outgoing {
                    Some(Outbound::Frame(envelope)) => envelope,
                    Some(Outbound::Release(connection_id)) => {
                        self.links.remove(&connection_id);
                        continue;
                    }
                    Some(Outbound::Shutdown) | None => {
                        if let Err(e) = writer.send(Message::Close(None)).await {
                            debug!("relay close frame not sent: {e}");
                        }
                        info!("relay connection for {} shut down", self.identity);
                        return;
                    }
                },
                _ = heartbeat.tick() => Envelope::heartbeat(),
                incoming = reader.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        self.handle_frame(&text);
                        continue;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("relay closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {
                        debug!("ignoring non-text relay frame");
                        continue;
                    }
                    Some(Err(e)) => {
                        error!("relay read error: {e}");
                        break;
                    }
                },
            };

            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(e) => {
                    warn!("dropping unencodable relay frame: {e}");
                    continue;
                }
            };
            if let Err(e) = writer.send(Message::Text(text)).await {
                error!("relay write error: {e}");
                break;
            }
        }

        self.lost();
    }

    /// The socket is gone. Links still negotiating cannot finish; links with
    /// an open data channel carry on without the relay.
    fn lost(&self) {
        for handle in self.links.drain() {
            if handle.is_open() {
                debug!("link {} to {} outlives the relay", handle.id(), handle.remote());
                continue;
            }
            if handle.shut() {
                self.emit(TransportEvent::Link {
                    link: handle.id(),
                    event: LinkEvent::Closed,
                });
            }
        }
        self.emit(TransportEvent::RelayError(RelayError::Unavailable(
            "relay connection lost".into(),
        )));
    }

    fn base(&self) -> String {
        let mut url = self.url.clone();
        url.set_query(None);
        url.to_string()
    }

    fn emit(&self, event: TransportEvent<WebRtcLink>) {
        if self.events.send(event).is_err() {
            debug!("relay event dropped, owner is gone");
        }
    }

    fn end_link(&self, handle: LinkHandle) {
        if handle.shut() {
            debug!("{} left link {}", handle.remote(), handle.id());
            self.emit(TransportEvent::Link {
                link: handle.id(),
                event: LinkEvent::Closed,
            });
        }
    }

    fn handle_frame(&self, text: &str) {
        let envelope: Envelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("malformed relay frame: {e}");
                return;
            }
        };

        match envelope.kind {
            EnvelopeKind::Open => {
                info!("relay accepted {}", self.identity);
                self.emit(TransportEvent::Registered(self.identity.clone()));
            }
            EnvelopeKind::IdTaken => {
                self.emit(TransportEvent::RelayError(RelayError::IdTaken(
                    self.identity.clone(),
                )));
            }
            EnvelopeKind::Error => {
                let msg = envelope.error_message().unwrap_or("unknown relay error");
                self.emit(TransportEvent::RelayError(RelayError::Server(
                    msg.to_string(),
                )));
            }
            EnvelopeKind::Offer => self.accept_offer(&envelope),
            EnvelopeKind::Answer | EnvelopeKind::Candidate => {
                let Some(handle) = envelope.connection_id().and_then(|c| self.links.get(c)) else {
                    debug!("{:?} for unknown link dropped", envelope.kind);
                    return;
                };
                match RemoteSignal::from_envelope(&envelope) {
                    Ok(Some(signal)) => handle.deliver(signal),
                    Ok(None) => debug!("{:?} without signaling dropped", envelope.kind),
                    Err(e) => warn!("undecodable {:?} for link {}: {e}", envelope.kind, handle.id()),
                }
            }
            EnvelopeKind::Leave => match (envelope.connection_id(), envelope.src.as_ref()) {
                (Some(connection_id), _) => {
                    if let Some(handle) = self.links.remove(connection_id) {
                        self.end_link(handle);
                    }
                }
                (None, Some(src)) => {
                    for handle in self.links.remove_remote(src) {
                        self.end_link(handle);
                    }
                }
                (None, None) => debug!("LEAVE without link or peer dropped"),
            },
            EnvelopeKind::Expire => {
                let removed = envelope.connection_id().and_then(|c| self.links.remove(c));
                let peer = envelope
                    .src
                    .clone()
                    .or_else(|| removed.as_ref().map(|handle| handle.remote().clone()));
                if let Some(handle) = removed {
                    handle.shut();
                }
                match peer {
                    Some(peer) => self.emit(TransportEvent::RelayError(
                        RelayError::PeerUnavailable(peer),
                    )),
                    None => debug!("EXPIRE frame without peer dropped"),
                }
            }
            EnvelopeKind::Heartbeat => {}
        }
    }

    fn accept_offer(&self, envelope: &Envelope) {
        let (Some(src), Some(connection_id)) = (envelope.src.as_ref(), envelope.connection_id())
        else {
            warn!("OFFER without src or connection id dropped");
            return;
        };
        if self.links.contains(connection_id) {
            debug!("duplicate OFFER {connection_id} ignored");
            return;
        }
        let offer = match RemoteSignal::from_envelope(envelope) {
            Ok(Some(offer)) => offer,
            Ok(None) => {
                warn!("OFFER {connection_id} from {src} carries no session description");
                return;
            }
            Err(e) => {
                warn!("OFFER {connection_id} from {src} is undecodable: {e}");
                return;
            }
        };

        let (link, handle) = WebRtcLink::start(
            LinkSetup {
                id: self.links.next_id(),
                remote: src.clone(),
                connection_id: connection_id.to_string(),
                role: Role::Answerer,
                config: self.webrtc.clone(),
                events: self.events.clone(),
                frames: self.outbound.clone(),
            },
            &Handle::current(),
        );
        info!("incoming link {connection_id} from {src}");
        self.links.insert(connection_id, handle.clone());
        self.emit(TransportEvent::Incoming(link));
        handle.deliver(offer);
    }
}
