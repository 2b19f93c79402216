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

//! Per-client broadcast of [`ClientEvent`]s.

use crate::events::ClientEvent;
use async_broadcast::{broadcast, InactiveReceiver, Receiver, Sender};
use log::trace;

/// Slow subscribers lose the oldest events rather than stall the client.
const EVENT_BUS_CAPACITY: usize = 256;

/// Broadcast channel shared by one client and its subscribers.
///
/// An inactive receiver keeps the channel open while nobody listens, so
/// emitting never fails for lack of subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<ClientEvent>,
    _keepalive: InactiveReceiver<ClientEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (mut sender, receiver) = broadcast(EVENT_BUS_CAPACITY);
        sender.set_overflow(true);
        Self {
            sender,
            _keepalive: receiver.deactivate(),
        }
    }

    pub fn subscribe(&self) -> Receiver<ClientEvent> {
        self.sender.new_receiver()
    }

    /// Publish without waiting.
    pub fn emit(&self, event: ClientEvent) {
        if let Err(e) = self.sender.try_broadcast(event) {
            trace!("client event not delivered: {e}");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
