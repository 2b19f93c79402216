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

mod app;
mod cli_args;
mod commands;
mod render;

use anyhow::anyhow;
use app::App;
use clap::Parser;
use cli_args::Opt;
use peerchat_client::ChatClient;
use peerchat_enhance::{EnhancerConfig, PolishClient};
use peerchat_transport::{WebRtcConfig, WebSocketRelay};
use tracing::info;
use tracing::level_filters::LevelFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))?;

    let opt = Opt::parse();

    let mut enhancer = EnhancerConfig::from_env();
    if let Some(model) = opt.model {
        enhancer = enhancer.with_model(model);
    }
    if let Some(endpoint) = opt.enhance_endpoint.as_deref() {
        enhancer = enhancer.with_endpoint(endpoint);
    }

    let polisher = PolishClient::new(enhancer)?;

    info!("using relay {}", opt.relay_url);
    let mut webrtc = WebRtcConfig::default();
    if !opt.ice_servers.is_empty() {
        webrtc.ice_servers = opt.ice_servers;
    }
    let relay = WebSocketRelay::new(opt.relay_url.as_str())?
        .with_key(opt.relay_key)
        .with_webrtc(webrtc);
    let client = ChatClient::start(relay);

    App::new(client, polisher, opt.connect)
        .run()
        .await
}
