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

//! Transport layer for peerchat.
//!
//! A client talks to the world through two seams:
//!
//! - [`SignalingRelay`]: registers the local identity and brokers new links to
//!   remote identities.
//! - [`PeerLink`]: one established (or establishing) data link to a remote
//!   party. A client holds at most one.
//!
//! Everything the transport observes is queued as a [`TransportEvent`] on an
//! [`EventSink`]; the owner drains the queue and feeds link events to a
//! [`LinkEvents`] handler one at a time.
//!
//! # Features
//!
//! - **`native`**: [`websocket::WebSocketRelay`], a relay client over
//!   `tokio-tungstenite`, and [`rtc::WebRtcLink`], the direct data-channel
//!   link it negotiates with the `webrtc` crate.

pub mod envelope;
pub mod error;
pub mod event;
pub mod memory;
pub mod relay;

#[cfg(feature = "native")]
pub mod rtc;
#[cfg(feature = "native")]
pub mod websocket;

pub use error::{RelayError, TransportError};
pub use event::{event_channel, EventSink, EventStream, LinkEvent, LinkEvents, LinkId, TransportEvent};
pub use memory::{MemoryHub, MemoryLink, MemoryRelay};
pub use relay::{PeerLink, SignalingRelay};

#[cfg(feature = "native")]
pub use rtc::{Role, WebRtcConfig, WebRtcLink};
#[cfg(feature = "native")]
pub use websocket::WebSocketRelay;
