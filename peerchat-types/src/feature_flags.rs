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

//! Feature flags for peerchat.
//!
//! Flags are loaded lazily from environment variables on first access. The only
//! flag today is text enhancement, which is on exactly when an API credential
//! is present.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

/// Environment variables checked, in order, for the text-enhancement credential.
pub const CREDENTIAL_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Override states for testing
const OVERRIDE_NONE: u8 = 0;
const OVERRIDE_TRUE: u8 = 1;
const OVERRIDE_FALSE: u8 = 2;

static TEXT_ENHANCEMENT_OVERRIDE: AtomicU8 = AtomicU8::new(OVERRIDE_NONE);

/// Feature flags singleton, lazily initialized from environment variables.
#[derive(Debug, Clone)]
pub struct FeatureFlags {
    /// Offer the AI rewrite action in the compose box.
    /// Env: GEMINI_API_KEY or API_KEY set to a non-blank value.
    pub text_enhancement: bool,
}

impl FeatureFlags {
    fn from_env() -> Self {
        Self {
            text_enhancement: credential_from_env().is_some(),
        }
    }

    /// Get the global feature flags instance.
    pub fn global() -> &'static Self {
        static FLAGS: OnceLock<FeatureFlags> = OnceLock::new();
        FLAGS.get_or_init(FeatureFlags::from_env)
    }

    /// Check if text enhancement is enabled. Respects test overrides if set.
    #[inline]
    pub fn text_enhancement_enabled() -> bool {
        match TEXT_ENHANCEMENT_OVERRIDE.load(Ordering::SeqCst) {
            OVERRIDE_TRUE => true,
            OVERRIDE_FALSE => false,
            _ => Self::global().text_enhancement,
        }
    }

    /// Only available with the `testing` feature enabled.
    #[cfg(any(test, feature = "testing"))]
    pub fn set_text_enhancement_override(enabled: bool) {
        let value = if enabled {
            OVERRIDE_TRUE
        } else {
            OVERRIDE_FALSE
        };
        TEXT_ENHANCEMENT_OVERRIDE.store(value, Ordering::SeqCst);
    }

    /// Only available with the `testing` feature enabled.
    #[cfg(any(test, feature = "testing"))]
    pub fn clear_text_enhancement_override() {
        TEXT_ENHANCEMENT_OVERRIDE.store(OVERRIDE_NONE, Ordering::SeqCst);
    }
}

/// The first non-blank credential found in [`CREDENTIAL_ENV_VARS`].
pub fn credential_from_env() -> Option<String> {
    credential_from(|name| std::env::var(name).ok())
}

/// Like [`credential_from_env`], reading variables through `lookup`.
pub fn credential_from(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    first_non_blank(CREDENTIAL_ENV_VARS.iter().map(|name| lookup(name)))
}

fn first_non_blank(values: impl IntoIterator<Item = Option<String>>) -> Option<String> {
    values
        .into_iter()
        .flatten()
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}
