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

//! Endpoint identities.
//!
//! An [`Identity`] names one chat endpoint to the signaling relay. It is
//! generated locally at startup and never persisted, so every restart yields a
//! fresh one.

use crate::clock::{now_ms, to_base36};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix shared by every generated identity.
const IDENTITY_PREFIX: &str = "user";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Generate a new identity of the form `user-<4 digits>-<epoch ms, base 36>`.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng(), now_ms())
    }

    /// Deterministic variant of [`generate`](Self::generate) for tests.
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R, now_ms: u64) -> Self {
        let suffix: u16 = rng.gen_range(1000..10000);
        Self(format!("{IDENTITY_PREFIX}-{suffix}-{}", to_base36(now_ms)))
    }

    /// Parse a user-supplied identity. Surrounding whitespace is dropped and an
    /// empty result is rejected.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Two-letter avatar label shown in the chat header.
    pub fn initials(&self) -> String {
        self.0.chars().take(2).collect::<String>().to_uppercase()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_identity_shape() {
        let id = Identity::generate_with(&mut StdRng::seed_from_u64(7), 1_700_000_000_000);
        let parts: Vec<&str> = id.as_str().split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "user");
        let digits: u16 = parts[1].parse().unwrap();
        assert!((1000..10000).contains(&digits));
        assert_eq!(parts[2], "loyw3v28");
    }

    #[test]
    fn test_generated_identities_differ() {
        let ids: std::collections::HashSet<Identity> = (0..16).map(|_| Identity::generate()).collect();
        assert!(ids.len() > 1);
    }

    #[test]
    fn test_parse_trims_and_rejects_empty() {
        assert_eq!(Identity::parse("  user-1234-abc \n").unwrap().as_str(), "user-1234-abc");
        assert!(Identity::parse("").is_none());
        assert!(Identity::parse("   ").is_none());
    }

    #[test]
    fn test_initials() {
        assert_eq!(Identity::parse("user-1234-abc").unwrap().initials(), "US");
        assert_eq!(Identity::parse("x").unwrap().initials(), "X");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = Identity::parse("user-1234-abc").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"user-1234-abc\"");
    }
}
