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

//! Async driver around [`ChatController`].
//!
//! A single tokio task owns the controller and applies, one at a time, user
//! commands, transport events and expiring reset timers. Frontends read the
//! resulting state through a `watch` channel and discrete events through
//! the client's [`EventBus`].

use crate::controller::{ChatController, ERROR_RESET_DELAY};
use crate::error::IntentError;
use crate::event_bus::EventBus;
use crate::events::{ClientEvent, ResetTicket};
use crate::lifecycle::{LifecycleState, RegistrationStatus};
use anyhow::{anyhow, Result};
use log::{debug, info};
use peerchat_transport::{event_channel, EventStream, SignalingRelay};
use peerchat_types::{ChatMessage, Identity};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Everything a frontend renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientSnapshot {
    /// `None` while registration is pending.
    pub identity: Option<Identity>,
    /// Kept after a failure, so late observers still see it.
    pub registration: RegistrationStatus,
    pub state: LifecycleState,
    pub remote: Option<Identity>,
    pub messages: Vec<ChatMessage>,
}

impl ClientSnapshot {
    fn of<R: SignalingRelay>(controller: &ChatController<R>) -> Self {
        Self {
            identity: controller.identity().cloned(),
            registration: controller.registration().clone(),
            state: controller.state(),
            remote: controller.remote().cloned(),
            messages: controller.messages().to_vec(),
        }
    }
}

enum Command {
    Connect(String, oneshot::Sender<Result<(), IntentError>>),
    Send(String, oneshot::Sender<Result<ChatMessage, IntentError>>),
    Disconnect(oneshot::Sender<()>),
    Shutdown,
}

/// Handle to a running chat client.
///
/// Dropping the handle stops the client and releases its identity.
pub struct ChatClient {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<ClientSnapshot>,
    bus: EventBus,
    task: Option<JoinHandle<()>>,
}

impl ChatClient {
    /// Register with `relay` and start the client task. Must be called from
    /// within a tokio runtime.
    pub fn start<R: SignalingRelay>(relay: R) -> Self {
        Self::start_with_reset_delay(relay, ERROR_RESET_DELAY)
    }

    pub fn start_with_reset_delay<R: SignalingRelay>(relay: R, reset_delay: Duration) -> Self {
        let (sink, transport) = event_channel();
        let mut controller = ChatController::new(relay, sink);
        // A failure is logged and published as RegistrationFailed.
        let _ = controller.startup();

        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (resets_tx, resets) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot) = watch::channel(ClientSnapshot::of(&controller));
        let bus = EventBus::new();

        let driver = Driver {
            controller,
            transport,
            commands,
            resets,
            resets_tx,
            reset_delay,
            snapshot: snapshot_tx,
            bus: bus.clone(),
        };
        let task = tokio::spawn(driver.run());

        Self {
            commands: commands_tx,
            snapshot,
            bus,
            task: Some(task),
        }
    }

    pub async fn connect(&self, target: &str) -> Result<(), IntentError> {
        let (reply, response) = oneshot::channel();
        self.request(Command::Connect(target.to_string(), reply))?;
        response.await.map_err(|_| IntentError::ClientClosed)?
    }

    pub async fn send(&self, text: &str) -> Result<ChatMessage, IntentError> {
        let (reply, response) = oneshot::channel();
        self.request(Command::Send(text.to_string(), reply))?;
        response.await.map_err(|_| IntentError::ClientClosed)?
    }

    pub async fn disconnect(&self) -> Result<(), IntentError> {
        let (reply, response) = oneshot::channel();
        self.request(Command::Disconnect(reply))?;
        response.await.map_err(|_| IntentError::ClientClosed)
    }

    /// The latest published state.
    pub fn snapshot(&self) -> ClientSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<ClientSnapshot> {
        self.snapshot.clone()
    }

    /// Receive future [`ClientEvent`]s.
    pub fn subscribe(&self) -> async_broadcast::Receiver<ClientEvent> {
        self.bus.subscribe()
    }

    /// Wait until the published state satisfies `predicate`.
    pub async fn wait_for<F>(&self, predicate: F) -> Result<ClientSnapshot, IntentError>
    where
        F: Fn(&ClientSnapshot) -> bool,
    {
        let mut snapshot = self.snapshot.clone();
        loop {
            {
                let current = snapshot.borrow_and_update();
                if predicate(&current) {
                    return Ok(current.clone());
                }
            }
            snapshot
                .changed()
                .await
                .map_err(|_| IntentError::ClientClosed)?;
        }
    }

    /// Stop the client task and wait for it to release the relay.
    pub async fn shutdown(mut self) -> Result<()> {
        let _ = self.commands.send(Command::Shutdown);
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| anyhow!("chat client task failed: {e}")),
            None => Ok(()),
        }
    }

    fn request(&self, command: Command) -> Result<(), IntentError> {
        self.commands
            .send(command)
            .map_err(|_| IntentError::ClientClosed)
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.commands.send(Command::Shutdown);
        }
    }
}

struct Driver<R: SignalingRelay> {
    controller: ChatController<R>,
    transport: EventStream<R::Link>,
    commands: mpsc::UnboundedReceiver<Command>,
    resets: mpsc::UnboundedReceiver<ResetTicket>,
    resets_tx: mpsc::UnboundedSender<ResetTicket>,
    reset_delay: Duration,
    snapshot: watch::Sender<ClientSnapshot>,
    bus: EventBus,
}

impl<R: SignalingRelay> Driver<R> {
    async fn run(mut self) {
        self.publish();
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(event) = self.transport.recv() => self.controller.handle_event(event),
                Some(ticket) = self.resets.recv() => self.controller.on_error_timeout(ticket),
            }
            self.publish();
        }
        info!("chat client shutting down");
        self.controller.shutdown();
        self.publish();
    }

    /// Replies are sent after publishing, so a caller resuming from an
    /// intent already sees its effect in the snapshot.
    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect(target, reply) => {
                let result = self.controller.connect_outbound(&target);
                self.publish();
                let _ = reply.send(result);
            }
            Command::Send(text, reply) => {
                let result = self.controller.send(&text);
                self.publish();
                let _ = reply.send(result);
            }
            Command::Disconnect(reply) => {
                self.controller.disconnect();
                self.publish();
                let _ = reply.send(());
            }
            Command::Shutdown => {}
        }
    }

    fn publish(&mut self) {
        for event in self.controller.drain_events() {
            if let ClientEvent::ConnectionFailed { reset, .. } = &event {
                self.schedule_reset(*reset);
            }
            self.bus.emit(event);
        }
        let next = ClientSnapshot::of(&self.controller);
        self.snapshot.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    fn schedule_reset(&self, ticket: ResetTicket) {
        debug!("error reset scheduled in {:?}", self.reset_delay);
        let resets = self.resets_tx.clone();
        let delay = self.reset_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = resets.send(ticket);
        });
    }
}
