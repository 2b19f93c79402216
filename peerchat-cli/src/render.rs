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

//! Plain-text rendering of the connection panel, the chat view and the
//! error toast.

use chrono::{DateTime, Local, TimeZone};
use peerchat_client::LifecycleState;
use peerchat_types::{ChatMessage, Identity};

pub const GENERATING_ID: &str = "Generating ID...";
pub const CONNECT_LABEL: &str = "Start Secure Chat";
pub const CONNECTING_LABEL: &str = "Connecting...";
pub const CONNECTION_FAILED: &str = "Connection Failed. Check ID.";
pub const TARGET_PLACEHOLDER: &str = "Enter Friend's ID";
pub const COMPOSE_PLACEHOLDER: &str = "Type a secure message...";

/// Label of the connect action, and whether it is enabled.
pub fn connect_button(state: LifecycleState, target: &str) -> (&'static str, bool) {
    let label = if state == LifecycleState::Connecting {
        CONNECTING_LABEL
    } else {
        CONNECT_LABEL
    };
    let enabled = state != LifecycleState::Connecting && !target.trim().is_empty();
    (label, enabled)
}

pub fn connection_panel(identity: Option<&Identity>, state: LifecycleState) -> String {
    let id = identity.map_or(GENERATING_ID, Identity::as_str);
    let (label, _) = connect_button(state, "");
    let mut panel = format!(
        "=== peerchat ===\n\
         Secure, Local, Peer-to-Peer Chat\n\
         \n\
         Your Secure ID: {id}\n\
         Share this ID with a friend to start chatting.\n\
         \n\
         /connect <{TARGET_PLACEHOLDER}>   [{label}]"
    );
    if state == LifecycleState::Error {
        panel.push('\n');
        panel.push_str(&toast());
    }
    panel
}

pub fn registration_failed(reason: &str) -> String {
    format!("Could not register with the relay: {reason}")
}

pub fn toast() -> String {
    format!("!! {CONNECTION_FAILED}")
}

pub fn chat_header(remote: &Identity) -> String {
    format!(
        "--- [{}] {remote} | Encrypted Channel ---\n\
         Direct connection established. Messages are stored only on your device.",
        remote.initials()
    )
}

pub fn message_line(message: &ChatMessage) -> String {
    message_line_at(message, &Local)
}

/// `HH:MM` in the given zone. Unrepresentable timestamps render as `--:--`.
pub fn format_time<Tz: TimeZone>(timestamp_ms: u64, zone: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    i64::try_from(timestamp_ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|utc| utc.with_timezone(zone).format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

fn message_line_at<Tz: TimeZone>(message: &ChatMessage, zone: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let time = format_time(message.timestamp(), zone);
    if message.is_local() {
        format!("{time} > me: {}", message.text())
    } else {
        format!("{time} < {}: {}", message.sender_id().initials(), message.text())
    }
}

pub fn prompt(state: LifecycleState, draft: &str) -> String {
    match state {
        LifecycleState::Connected if draft.is_empty() => format!("({COMPOSE_PLACEHOLDER})"),
        LifecycleState::Connected => format!("draft: {draft}"),
        _ => String::new(),
    }
}
