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

use clap::Parser;
use url::Url;

/// Peer-to-peer chat in the terminal.
///
/// Share the ID printed at startup with a friend, or connect to theirs with
/// `/connect <id>`.
#[derive(Parser, Debug)]
#[clap(name = "peerchat", version)]
pub struct Opt {
    /// WebSocket URL of the signaling relay.
    #[clap(long = "relay-url", default_value = "ws://127.0.0.1:9000/peerchat")]
    pub relay_url: Url,

    /// API key presented to the relay.
    #[clap(long = "relay-key", default_value = "peerjs")]
    pub relay_key: String,

    /// STUN/TURN server for the direct link. Repeatable; defaults to a
    /// public STUN server.
    #[clap(long = "ice-server")]
    pub ice_servers: Vec<String>,

    /// Connect to this ID as soon as the relay assigns ours.
    #[clap(long = "connect")]
    pub connect: Option<String>,

    /// Model used for /polish. Defaults to GEMINI_MODEL or the built-in model.
    #[clap(long = "model")]
    pub model: Option<String>,

    /// Base URL of the text enhancement API.
    #[clap(long = "enhance-endpoint")]
    pub enhance_endpoint: Option<String>,
}
