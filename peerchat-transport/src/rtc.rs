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

//! Direct peer links over a WebRTC data channel, using the `webrtc` crate.
//!
//! A [`WebRtcLink`] is a synchronous handle. Behind it, one task per link owns
//! the `RTCPeerConnection`: it applies remote signaling in the order the relay
//! delivered it, writes outgoing payloads to the data channel and tears the
//! connection down when the owner closes the link. Session descriptions and
//! ICE candidates leave through the relay as [`Envelope`]s; payloads never do.

use crate::envelope::{Envelope, EnvelopeKind};
use crate::error::TransportError;
use crate::event::{EventSink, LinkEvent, LinkId, TransportEvent};
use crate::relay::PeerLink;
use crate::websocket::Outbound;
use bytes::Bytes;
use log::{debug, info, warn};
use peerchat_types::Identity;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::api::APIBuilder;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;

pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// How long a link may take to open its data channel before it fails.
pub const NEGOTIATION_TIMEOUT: Duration = Duration::from_secs(30);

/// ICE and timing settings shared by every link of one relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebRtcConfig {
    /// STUN/TURN urls. Empty means host candidates only.
    pub ice_servers: Vec<String>,
    pub include_loopback: bool,
    pub negotiation_timeout: Duration,
}

impl Default for WebRtcConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![DEFAULT_STUN_SERVER.to_string()],
            include_loopback: false,
            negotiation_timeout: NEGOTIATION_TIMEOUT,
        }
    }
}

impl WebRtcConfig {
    /// Host candidates only, loopback included. For peers on one machine.
    pub fn local() -> Self {
        Self {
            ice_servers: Vec::new(),
            include_loopback: true,
            ..Self::default()
        }
    }

    fn rtc_configuration(&self) -> RTCConfiguration {
        let ice_servers = if self.ice_servers.is_empty() {
            Vec::new()
        } else {
            vec![RTCIceServer {
                urls: self.ice_servers.clone(),
                ..Default::default()
            }]
        };
        RTCConfiguration {
            ice_servers,
            ..Default::default()
        }
    }

    async fn peer_connection(&self) -> Result<RTCPeerConnection, webrtc::Error> {
        let mut media = MediaEngine::default();
        let registry = register_default_interceptors(Registry::new(), &mut media)?;
        let mut settings = SettingEngine::default();
        settings.set_include_loopback_candidate(self.include_loopback);
        let api = APIBuilder::new()
            .with_media_engine(media)
            .with_interceptor_registry(registry)
            .with_setting_engine(settings)
            .build();
        api.new_peer_connection(self.rtc_configuration()).await
    }
}

/// Which side of the offer/answer exchange a link plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Offerer,
    Answerer,
}

#[derive(Debug, Error)]
enum NegotiationError {
    #[error(transparent)]
    WebRtc(#[from] webrtc::Error),

    #[error("unencodable session description: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Signaling received from the remote party.
#[derive(Debug)]
pub(crate) enum RemoteSignal {
    Offer(RTCSessionDescription),
    Answer(RTCSessionDescription),
    Candidate(RTCIceCandidateInit),
}

impl RemoteSignal {
    /// Decode the signaling carried by a relay frame. `Ok(None)` for frames
    /// that carry none.
    pub(crate) fn from_envelope(envelope: &Envelope) -> Result<Option<Self>, serde_json::Error> {
        let signal = match envelope.kind {
            EnvelopeKind::Offer | EnvelopeKind::Answer => {
                let Some(sdp) = envelope.sdp() else {
                    return Ok(None);
                };
                let description: RTCSessionDescription = serde_json::from_value(sdp.clone())?;
                if envelope.kind == EnvelopeKind::Offer {
                    Self::Offer(description)
                } else {
                    Self::Answer(description)
                }
            }
            EnvelopeKind::Candidate => {
                let Some(candidate) = envelope.ice_candidate() else {
                    return Ok(None);
                };
                Self::Candidate(serde_json::from_value(candidate.clone())?)
            }
            _ => return Ok(None),
        };
        Ok(Some(signal))
    }
}

#[derive(Debug)]
enum Input {
    Remote(RemoteSignal),
    Payload(Vec<u8>),
    Close,
}

#[derive(Debug, Default)]
struct LinkState {
    open: AtomicBool,
    finished: AtomicBool,
}

impl LinkState {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.is_finished()
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// `true` for the first caller only.
    fn finish(&self) -> bool {
        !self.finished.swap(true, Ordering::AcqRel)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Everything needed to start one link.
pub(crate) struct LinkSetup {
    pub id: LinkId,
    pub remote: Identity,
    pub connection_id: String,
    pub role: Role,
    pub config: Arc<WebRtcConfig>,
    pub events: EventSink<WebRtcLink>,
    pub frames: mpsc::UnboundedSender<Outbound>,
}

/// The relay's side of a link: where remote signaling is delivered.
#[derive(Debug, Clone)]
pub(crate) struct LinkHandle {
    id: LinkId,
    remote: Identity,
    state: Arc<LinkState>,
    inputs: mpsc::UnboundedSender<Input>,
}

impl LinkHandle {
    pub(crate) fn id(&self) -> LinkId {
        self.id
    }

    pub(crate) fn remote(&self) -> &Identity {
        &self.remote
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub(crate) fn deliver(&self, signal: RemoteSignal) {
        if self.inputs.send(Input::Remote(signal)).is_err() {
            debug!("signaling for finished link {} dropped", self.id);
        }
    }

    /// End the link from the relay side. Returns `true` if the owner still
    /// considered it live and must be told.
    pub(crate) fn shut(&self) -> bool {
        let live = self.state.finish();
        let _ = self.inputs.send(Input::Close);
        live
    }
}

/// One data link to a remote party over a WebRTC data channel.
///
/// The link reports [`LinkEvent::Open`] once its data channel opens; payloads
/// sent before that are refused.
#[derive(Debug)]
pub struct WebRtcLink {
    id: LinkId,
    remote: Identity,
    connection_id: String,
    role: Role,
    state: Arc<LinkState>,
    inputs: mpsc::UnboundedSender<Input>,
    frames: mpsc::UnboundedSender<Outbound>,
    released: bool,
}

impl WebRtcLink {
    /// Spawn the link's negotiation task on `runtime`.
    pub(crate) fn start(setup: LinkSetup, runtime: &Handle) -> (Self, LinkHandle) {
        let state = Arc::new(LinkState::default());
        let (inputs, inputs_rx) = mpsc::unbounded_channel();
        let negotiation = Negotiation {
            id: setup.id,
            role: setup.role,
            remote: setup.remote.clone(),
            connection_id: setup.connection_id.clone(),
            config: setup.config,
            events: setup.events,
            frames: setup.frames.clone(),
            state: state.clone(),
            channel: Arc::default(),
        };
        runtime.spawn(negotiation.run(inputs_rx));

        let handle = LinkHandle {
            id: setup.id,
            remote: setup.remote.clone(),
            state: state.clone(),
            inputs: inputs.clone(),
        };
        let link = Self {
            id: setup.id,
            remote: setup.remote,
            connection_id: setup.connection_id,
            role: setup.role,
            state,
            inputs,
            frames: setup.frames,
            released: false,
        };
        (link, handle)
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_finished()
    }
}

impl PeerLink for WebRtcLink {
    fn id(&self) -> LinkId {
        self.id
    }

    fn remote(&self) -> &Identity {
        &self.remote
    }

    fn send(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.state.is_finished() {
            return Err(TransportError::Closed);
        }
        if !self.state.is_open() {
            return Err(TransportError::Send("data channel is not open".into()));
        }
        self.inputs
            .send(Input::Payload(payload))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) {
        if std::mem::replace(&mut self.released, true) {
            return;
        }
        self.state.finish();
        let leave = Envelope::to_peer(EnvelopeKind::Leave, &self.remote, &self.connection_id);
        let _ = self.frames.send(Outbound::Frame(leave));
        let _ = self.frames.send(Outbound::Release(self.connection_id.clone()));
        let _ = self.inputs.send(Input::Close);
        debug!("closed link {} to {}", self.id, self.remote);
    }
}

/// The per-link task state. Cloned into every `webrtc` callback.
#[derive(Clone)]
struct Negotiation {
    id: LinkId,
    role: Role,
    remote: Identity,
    connection_id: String,
    config: Arc<WebRtcConfig>,
    events: EventSink<WebRtcLink>,
    frames: mpsc::UnboundedSender<Outbound>,
    state: Arc<LinkState>,
    channel: Arc<Mutex<Option<Arc<RTCDataChannel>>>>,
}

impl Negotiation {
    async fn run(self, mut inputs: mpsc::UnboundedReceiver<Input>) {
        let pc = match self.config.peer_connection().await {
            Ok(pc) => Arc::new(pc),
            Err(e) => {
                self.fail(format!("peer connection setup failed: {e}"));
                return;
            }
        };
        self.watch(&pc);
        if let Err(e) = self.begin(&pc).await {
            self.fail(format!("could not start negotiation: {e}"));
        }

        let mut pending = Vec::new();
        let deadline = tokio::time::sleep(self.config.negotiation_timeout);
        tokio::pin!(deadline);
        let mut timed_out = false;
        loop {
            tokio::select! {
                input = inputs.recv() => match input {
                    Some(Input::Remote(signal)) => {
                        if let Err(e) = self.apply(&pc, signal, &mut pending).await {
                            self.fail(format!("negotiation failed: {e}"));
                        }
                    }
                    Some(Input::Payload(payload)) => self.write(payload).await,
                    Some(Input::Close) | None => break,
                },
                _ = &mut deadline, if !timed_out => {
                    timed_out = true;
                    if !self.state.open.load(Ordering::Acquire) {
                        self.fail("negotiation timed out".into());
                    }
                }
            }
        }
        self.teardown(&pc).await;
    }

    async fn begin(&self, pc: &Arc<RTCPeerConnection>) -> Result<(), NegotiationError> {
        match self.role {
            Role::Offerer => {
                let dc = pc.create_data_channel(&self.connection_id, None).await?;
                self.adopt(dc);
                let offer = pc.create_offer(None).await?;
                // The offer leaves before gathering starts so no candidate overtakes it.
                self.signal(Envelope::offer(
                    &self.remote,
                    &self.connection_id,
                    serde_json::to_value(&offer)?,
                ));
                pc.set_local_description(offer).await?;
            }
            Role::Answerer => {
                let me = self.clone();
                pc.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
                    let me = me.clone();
                    Box::pin(async move { me.adopt(dc) })
                }));
            }
        }
        Ok(())
    }

    async fn apply(
        &self,
        pc: &RTCPeerConnection,
        signal: RemoteSignal,
        pending: &mut Vec<RTCIceCandidateInit>,
    ) -> Result<(), NegotiationError> {
        match (signal, self.role) {
            (RemoteSignal::Offer(offer), Role::Answerer) => {
                pc.set_remote_description(offer).await?;
                let answer = pc.create_answer(None).await?;
                self.signal(Envelope::answer(
                    &self.remote,
                    &self.connection_id,
                    serde_json::to_value(&answer)?,
                ));
                pc.set_local_description(answer).await?;
                self.flush(pc, pending).await;
            }
            (RemoteSignal::Answer(answer), Role::Offerer) => {
                pc.set_remote_description(answer).await?;
                self.flush(pc, pending).await;
            }
            (RemoteSignal::Candidate(candidate), _) => {
                if pc.remote_description().await.is_none() {
                    pending.push(candidate);
                } else {
                    self.add_candidate(pc, candidate).await;
                }
            }
            (signal, role) => debug!("link {} ({role:?}) ignored {signal:?}", self.id),
        }
        Ok(())
    }

    async fn flush(&self, pc: &RTCPeerConnection, pending: &mut Vec<RTCIceCandidateInit>) {
        for candidate in pending.drain(..) {
            self.add_candidate(pc, candidate).await;
        }
    }

    async fn add_candidate(&self, pc: &RTCPeerConnection, candidate: RTCIceCandidateInit) {
        if let Err(e) = pc.add_ice_candidate(candidate).await {
            warn!("ignoring remote ICE candidate on link {}: {e}", self.id);
        }
    }

    fn watch(&self, pc: &RTCPeerConnection) {
        let me = self.clone();
        pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
            let me = me.clone();
            Box::pin(async move {
                debug!("link {} peer connection {s}", me.id);
                match s {
                    RTCPeerConnectionState::Failed => me.fail("peer connection failed".into()),
                    RTCPeerConnectionState::Disconnected | RTCPeerConnectionState::Closed => {
                        me.remote_closed("peer connection lost")
                    }
                    _ => {}
                }
            })
        }));

        let me = self.clone();
        pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let me = me.clone();
            Box::pin(async move {
                if let Some(candidate) = candidate {
                    me.send_candidate(&candidate);
                }
            })
        }));
    }

    fn adopt(&self, dc: Arc<RTCDataChannel>) {
        debug!("data channel '{}' attached to link {}", dc.label(), self.id);
        *lock(&self.channel) = Some(dc.clone());

        let me = self.clone();
        dc.on_open(Box::new(move || {
            let me = me.clone();
            Box::pin(async move { me.opened() })
        }));
        let me = self.clone();
        dc.on_message(Box::new(move |msg: DataChannelMessage| {
            let me = me.clone();
            Box::pin(async move {
                if !me.state.is_finished() {
                    me.emit(LinkEvent::Data(msg.data.to_vec()));
                }
            })
        }));
        let me = self.clone();
        dc.on_close(Box::new(move || {
            let me = me.clone();
            Box::pin(async move { me.remote_closed("data channel closed") })
        }));
        let me = self.clone();
        dc.on_error(Box::new(move |err: webrtc::Error| {
            let me = me.clone();
            Box::pin(async move { me.fail(format!("data channel error: {err}")) })
        }));
    }

    fn opened(&self) {
        if self.state.is_finished() {
            return;
        }
        self.state.open.store(true, Ordering::Release);
        info!("data channel to {} open on link {}", self.remote, self.id);
        self.emit(LinkEvent::Open);
    }

    fn remote_closed(&self, why: &str) {
        if self.state.finish() {
            info!("link {} to {} ended: {why}", self.id, self.remote);
            self.emit(LinkEvent::Closed);
        }
    }

    fn fail(&self, reason: String) {
        if self.state.finish() {
            warn!("link {} to {} failed: {reason}", self.id, self.remote);
            self.emit(LinkEvent::Error(reason));
        }
    }

    fn send_candidate(&self, candidate: &RTCIceCandidate) {
        if self.state.is_finished() {
            return;
        }
        let encoded = candidate
            .to_json()
            .map_err(NegotiationError::from)
            .and_then(|init| serde_json::to_value(init).map_err(NegotiationError::from));
        match encoded {
            Ok(value) => self.signal(Envelope::candidate(
                &self.remote,
                &self.connection_id,
                value,
            )),
            Err(e) => warn!("local ICE candidate on link {} not sent: {e}", self.id),
        }
    }

    async fn write(&self, payload: Vec<u8>) {
        let channel = lock(&self.channel).clone();
        let Some(dc) = channel else {
            warn!("payload on link {} dropped, no data channel", self.id);
            return;
        };
        if let Err(e) = dc.send(&Bytes::from(payload)).await {
            warn!("data channel send on link {} failed: {e}", self.id);
        }
    }

    async fn teardown(&self, pc: &RTCPeerConnection) {
        let channel = lock(&self.channel).take();
        if let Some(dc) = channel {
            if let Err(e) = dc.close().await {
                debug!("closing data channel of link {}: {e}", self.id);
            }
        }
        if let Err(e) = pc.close().await {
            debug!("closing peer connection of link {}: {e}", self.id);
        }
        debug!("link {} torn down", self.id);
    }

    fn signal(&self, envelope: Envelope) {
        let kind = envelope.kind;
        if self.frames.send(Outbound::Frame(envelope)).is_err() {
            debug!("relay is gone, {kind:?} for link {} dropped", self.id);
        }
    }

    fn emit(&self, event: LinkEvent) {
        let event = TransportEvent::Link {
            link: self.id,
            event,
        };
        if self.events.send(event).is_err() {
            debug!("link {} event dropped, owner is gone", self.id);
        }
    }
}
