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

//! Enhancement service configuration, read from the environment.

use peerchat_types::feature_flags::credential_from;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
/// Upper bound on one rewrite request, connection included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Overrides the model name.
pub const MODEL_ENV_VAR: &str = "GEMINI_MODEL";
/// Overrides the API base URL.
pub const ENDPOINT_ENV_VAR: &str = "GEMINI_ENDPOINT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancerConfig {
    /// Without a key the service is disabled and returns drafts unchanged.
    pub api_key: Option<String>,
    pub model: String,
    /// Base URL, without a trailing slash.
    pub endpoint: String,
    pub timeout: Duration,
}

impl EnhancerConfig {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Read the key from `GEMINI_API_KEY` (or `API_KEY`) and the optional
    /// model and endpoint overrides.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::new(credential_from(&lookup));
        if let Some(model) = non_blank(MODEL_ENV_VAR) {
            config.model = model;
        }
        if let Some(endpoint) = non_blank(ENDPOINT_ENV_VAR) {
            config = config.with_endpoint(&endpoint);
        }
        config
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self::new(None)
    }
}
