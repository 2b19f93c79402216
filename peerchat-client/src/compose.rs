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

//! State of the message compose box, including AI polishing.

use log::debug;

/// A snapshot of the draft handed to the enhancement service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolishRequest {
    text: String,
    generation: u64,
}

impl PolishRequest {
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// The draft being typed, plus whether a polish request is in flight.
///
/// Resetting the box (for example on disconnect) invalidates any in-flight
/// polish so a late result cannot resurrect an abandoned draft.
#[derive(Debug, Clone, Default)]
pub struct ComposeBox {
    text: String,
    polishing: bool,
    generation: u64,
}

impl ComposeBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn is_polishing(&self) -> bool {
        self.polishing
    }

    /// Whitespace-only drafts are never sent or polished.
    pub fn can_send(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Take the draft for sending, leaving the box empty.
    pub fn take_for_send(&mut self) -> Option<String> {
        if !self.can_send() {
            return None;
        }
        Some(std::mem::take(&mut self.text))
    }

    /// Start polishing the current draft. Only one request may be in flight.
    pub fn begin_polish(&mut self) -> Option<PolishRequest> {
        if self.polishing || !self.can_send() {
            return None;
        }
        self.polishing = true;
        Some(PolishRequest {
            text: self.text.clone(),
            generation: self.generation,
        })
    }

    /// Install the polished text. Returns `false` if the box was reset while
    /// the request was in flight.
    pub fn finish_polish(&mut self, request: PolishRequest, polished: String) -> bool {
        if request.generation != self.generation {
            debug!("discarding polish result for an abandoned draft");
            return false;
        }
        self.polishing = false;
        self.text = polished;
        true
    }

    pub fn reset(&mut self) {
        self.text.clear();
        self.polishing = false;
        self.generation += 1;
    }
}
