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

//! The interactive loop: stdin lines in, rendered client events out.

use crate::commands::{parse_input, Input, HELP};
use crate::render;
use anyhow::Result;
use peerchat_client::{
    ChatClient, ClientEvent, ComposeBox, IntentError, LifecycleState, PolishRequest,
    RegistrationStatus,
};
use peerchat_enhance::PolishClient;
use peerchat_types::FeatureFlags;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub struct App {
    client: ChatClient,
    polisher: PolishClient,
    compose: ComposeBox,
    auto_connect: Option<String>,
}

enum Flow {
    Continue,
    Quit,
}

impl App {
    pub fn new(client: ChatClient, polisher: PolishClient, auto_connect: Option<String>) -> Self {
        Self {
            client,
            polisher,
            compose: ComposeBox::new(),
            auto_connect,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let mut events = self.client.subscribe();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let (polished_tx, mut polished_rx) = mpsc::unbounded_channel();

        let snapshot = self.client.snapshot();
        println!(
            "{}",
            render::connection_panel(snapshot.identity.as_ref(), snapshot.state)
        );
        if let RegistrationStatus::Failed(reason) = &snapshot.registration {
            println!("{}", render::registration_failed(reason));
        }
        if snapshot.identity.is_some() {
            self.try_auto_connect().await;
        }

        loop {
            tokio::select! {
                line = lines.next_line() => match line? {
                    Some(line) => {
                        if let Flow::Quit = self.handle_line(&line, &polished_tx).await {
                            break;
                        }
                    }
                    None => break,
                },
                event = events.recv() => match event {
                    Ok(event) => self.handle_event(event).await,
                    Err(async_broadcast::RecvError::Overflowed(missed)) => {
                        warn!("display fell behind, {missed} events skipped");
                    }
                    Err(async_broadcast::RecvError::Closed) => break,
                },
                Some((request, polished)) = polished_rx.recv() => {
                    self.finish_polish(request, polished);
                }
            }
        }

        self.client.shutdown().await
    }

    async fn handle_line(
        &mut self,
        line: &str,
        polished_tx: &mpsc::UnboundedSender<(PolishRequest, String)>,
    ) -> Flow {
        let input = match parse_input(line) {
            Ok(input) => input,
            Err(e) => {
                println!("{e}");
                return Flow::Continue;
            }
        };
        match input {
            Input::Empty => {}
            Input::Quit => return Flow::Quit,
            Input::Help => println!("{HELP}"),
            Input::ShowId => {
                let snapshot = self.client.snapshot();
                let id = snapshot
                    .identity
                    .as_ref()
                    .map_or(render::GENERATING_ID, |id| id.as_str());
                println!("Your Secure ID: {id}");
            }
            Input::Connect(target) => self.connect(&target).await,
            Input::Disconnect => {
                if let Err(e) = self.client.disconnect().await {
                    println!("{e}");
                }
            }
            Input::Draft(text) => {
                self.compose.set_text(text);
                println!("{}", render::prompt(self.state(), self.compose.text()));
            }
            Input::Polish(text) => {
                if let Some(text) = text {
                    self.compose.set_text(text);
                }
                self.start_polish(polished_tx);
            }
            Input::SendDraft => {
                if let Some(text) = self.compose.take_for_send() {
                    self.send(&text).await;
                }
            }
            Input::Message(text) => self.send(&text).await,
        }
        Flow::Continue
    }

    async fn handle_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::IdentityAssigned(identity) => {
                println!("Your Secure ID: {identity}");
                println!("Share this ID with a friend to start chatting.");
                self.try_auto_connect().await;
            }
            ClientEvent::RegistrationFailed(reason) => {
                println!("{}", render::registration_failed(&reason));
            }
            ClientEvent::StateChanged { to, .. } => self.render_state(to),
            ClientEvent::ConnectionFailed { reason, .. } => {
                debug!("connection failed: {reason}");
            }
            ClientEvent::InboundRejected(remote) => {
                println!("{remote} tried to connect while you were busy");
            }
            ClientEvent::MessageAppended(message) => {
                println!("{}", render::message_line(&message));
            }
            ClientEvent::MessagesCleared => {}
        }
    }

    fn render_state(&mut self, state: LifecycleState) {
        match state {
            LifecycleState::Connecting => {
                println!("[{}]", render::CONNECTING_LABEL);
            }
            LifecycleState::Connected => {
                if let Some(remote) = self.client.snapshot().remote {
                    println!("{}", render::chat_header(&remote));
                }
                println!("{}", render::prompt(state, self.compose.text()));
            }
            LifecycleState::Error => println!("{}", render::toast()),
            LifecycleState::Disconnected => {
                self.compose.reset();
                let snapshot = self.client.snapshot();
                println!(
                    "{}",
                    render::connection_panel(snapshot.identity.as_ref(), state)
                );
            }
        }
    }

    async fn connect(&mut self, target: &str) {
        let (_, enabled) = render::connect_button(self.state(), target);
        if !enabled {
            println!("Wait for the current attempt to finish.");
            return;
        }
        match self.client.connect(target).await {
            Ok(()) => {}
            Err(IntentError::Busy(LifecycleState::Connected)) => {
                println!("Already chatting. /disconnect first.");
            }
            Err(e) => println!("{e}"),
        }
    }

    async fn send(&mut self, text: &str) {
        match self.client.send(text).await {
            Ok(_) => {}
            Err(IntentError::NotConnected) => {
                println!("Not connected. /connect <{}> first.", render::TARGET_PLACEHOLDER);
            }
            Err(e) => println!("{e}"),
        }
    }

    fn start_polish(&mut self, polished_tx: &mpsc::UnboundedSender<(PolishRequest, String)>) {
        if let Some(reason) = polish_blocker(self.polisher.is_enabled(), self.state()) {
            println!("{reason}");
            return;
        }
        let Some(request) = self.compose.begin_polish() else {
            println!("Nothing to polish, or a polish is already running.");
            return;
        };
        println!("Polishing...");
        let polisher = self.polisher.clone();
        let polished_tx = polished_tx.clone();
        tokio::spawn(async move {
            let polished = polisher.polish(request.text()).await;
            let _ = polished_tx.send((request, polished));
        });
    }

    fn finish_polish(&mut self, request: PolishRequest, polished: String) {
        if self.compose.finish_polish(request, polished) {
            println!("{}", render::prompt(self.state(), self.compose.text()));
            println!("/send to send it, or type a new message.");
        }
    }

    async fn try_auto_connect(&mut self) {
        if let Some(target) = self.auto_connect.take() {
            self.connect(&target).await;
        }
    }

    fn state(&self) -> LifecycleState {
        self.client.snapshot().state
    }
}

/// Why the polish action is unavailable right now, if it is.
fn polish_blocker(has_credential: bool, state: LifecycleState) -> Option<&'static str> {
    if !FeatureFlags::text_enhancement_enabled() || !has_credential {
        return Some("AI polish is unavailable: set GEMINI_API_KEY to enable it.");
    }
    if state != LifecycleState::Connected {
        return Some("Connect to a friend before polishing a message.");
    }
    None
}
