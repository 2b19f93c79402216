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

//! Transport events and the handler interface they are dispatched to.

use crate::error::RelayError;
use peerchat_types::Identity;
use tokio::sync::mpsc;

/// Locally unique handle for one link, used to drop events from links that
/// have already been torn down.
pub type LinkId = u64;

/// Something that happened on one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The data link is usable.
    Open,
    /// A payload arrived from the remote party.
    Data(Vec<u8>),
    /// The link was closed by the remote party or the relay.
    Closed,
    /// The link failed.
    Error(String),
}

/// Everything a relay or link reports to its owner.
#[derive(Debug)]
pub enum TransportEvent<L> {
    /// The relay accepted the local identity.
    Registered(Identity),
    /// The relay failed, or could not broker a requested link.
    RelayError(RelayError),
    /// A remote party opened a link to us.
    Incoming(L),
    /// An event on a specific link.
    Link { link: LinkId, event: LinkEvent },
}

/// Handler for per-link events: the `{onOpen, onData, onClose, onError}`
/// interface a link's owner implements.
pub trait LinkEvents {
    fn on_open(&mut self, link: LinkId);
    fn on_data(&mut self, link: LinkId, payload: Vec<u8>);
    fn on_close(&mut self, link: LinkId);
    fn on_error(&mut self, link: LinkId, reason: String);
}

impl LinkEvent {
    /// Route this event to the matching handler method.
    pub fn dispatch<H: LinkEvents + ?Sized>(self, link: LinkId, handler: &mut H) {
        match self {
            LinkEvent::Open => handler.on_open(link),
            LinkEvent::Data(payload) => handler.on_data(link, payload),
            LinkEvent::Closed => handler.on_close(link),
            LinkEvent::Error(reason) => handler.on_error(link, reason),
        }
    }
}

pub type EventSink<L> = mpsc::UnboundedSender<TransportEvent<L>>;
pub type EventStream<L> = mpsc::UnboundedReceiver<TransportEvent<L>>;

/// Create the queue a relay reports into.
pub fn event_channel<L>() -> (EventSink<L>, EventStream<L>) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl LinkEvents for Recorder {
        fn on_open(&mut self, link: LinkId) {
            self.calls.push(format!("open:{link}"));
        }

        fn on_data(&mut self, link: LinkId, payload: Vec<u8>) {
            self.calls
                .push(format!("data:{link}:{}", String::from_utf8_lossy(&payload)));
        }

        fn on_close(&mut self, link: LinkId) {
            self.calls.push(format!("close:{link}"));
        }

        fn on_error(&mut self, link: LinkId, reason: String) {
            self.calls.push(format!("error:{link}:{reason}"));
        }
    }

    #[test]
    fn test_dispatch_routes_each_variant() {
        let mut recorder = Recorder::default();
        LinkEvent::Open.dispatch(1, &mut recorder);
        LinkEvent::Data(b"hi".to_vec()).dispatch(1, &mut recorder);
        LinkEvent::Error("reset".into()).dispatch(2, &mut recorder);
        LinkEvent::Closed.dispatch(2, &mut recorder);
        assert_eq!(
            recorder.calls,
            vec!["open:1", "data:1:hi", "error:2:reset", "close:2"]
        );
    }
}
