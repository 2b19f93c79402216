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

//! Client-side core of peerchat: the connection lifecycle, the message store
//! and an async driver that runs them.
//!
//! This crate makes no assumptions about the UI. A frontend observes
//! [`ClientSnapshot`]s (or discrete [`ClientEvent`]s) and issues user intents
//! (connect, send, disconnect) through [`ChatClient`].
//!
//! # Outline of usage
//!
//! ```no_run
//! use peerchat_client::{ChatClient, LifecycleState};
//! use peerchat_transport::MemoryHub;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let hub = MemoryHub::new();
//! let alice = ChatClient::start(hub.relay());
//! let bob = ChatClient::start(hub.relay());
//!
//! let alice_id = alice.wait_for(|s| s.identity.is_some()).await?.identity.unwrap();
//! bob.wait_for(|s| s.identity.is_some()).await?;
//! bob.connect(alice_id.as_str()).await?;
//! bob.wait_for(|s| s.state == LifecycleState::Connected).await?;
//!
//! bob.send("hello").await?;
//! bob.disconnect().await?;
//! # Ok(())
//! # }
//! ```
//!
//! For deterministic, single-threaded use (tests, custom event loops) drive a
//! [`ChatController`] directly.

mod client;
mod compose;
mod controller;
mod error;
mod event_bus;
mod events;
mod lifecycle;
mod session;
mod store;

pub use client::{ChatClient, ClientSnapshot};
pub use compose::{ComposeBox, PolishRequest};
pub use controller::{ChatController, ERROR_RESET_DELAY};
pub use error::IntentError;
pub use event_bus::EventBus;
pub use events::{ClientEvent, ResetTicket};
pub use lifecycle::{LifecycleState, RegistrationStatus};
pub use session::{Direction, Session};
pub use store::MessageStore;
