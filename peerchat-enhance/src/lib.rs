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

//! AI rewrite of chat drafts through the Gemini `generateContent` API.
//!
//! The service is strictly best effort: [`PolishClient::polish`] hands back
//! the draft unchanged whenever anything goes wrong.
//!
//! # Example
//!
//! ```no_run
//! use peerchat_enhance::{EnhancerConfig, PolishClient};
//!
//! # async fn example() -> Result<(), peerchat_enhance::EnhanceError> {
//! let client = PolishClient::new(EnhancerConfig::from_env())?;
//! let polished = client.polish("hey whats up").await;
//! println!("{polished}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
mod gemini;

pub use config::EnhancerConfig;
pub use error::EnhanceError;

use gemini::GenerateContentRequest;
use log::{debug, warn};
use reqwest::Client;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// The instruction wrapped around every draft.
pub fn build_prompt(text: &str) -> String {
    format!(
        "Rewrite the following chat message to be clear, friendly, and grammatically correct. \
         Do not add quotes or explanations, just output the polished text: \"{text}\""
    )
}

#[derive(Debug, Clone)]
pub struct PolishClient {
    config: EnhancerConfig,
    http: Client,
}

impl PolishClient {
    /// Fails only if the HTTP client cannot be built (for example, no TLS
    /// backend is available).
    pub fn new(config: EnhancerConfig) -> Result<Self, EnhanceError> {
        if !config.is_enabled() {
            warn!("no Gemini API key configured, text enhancement disabled");
        }
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    pub fn config(&self) -> &EnhancerConfig {
        &self.config
    }

    /// Rewrite `text`, or return it unchanged if the service is disabled or
    /// the request fails for any reason.
    pub async fn polish(&self, text: &str) -> String {
        match self.try_polish(text).await {
            Ok(polished) => polished,
            Err(EnhanceError::MissingCredential) => text.to_string(),
            Err(e) => {
                warn!("failed to polish message: {e}");
                text.to_string()
            }
        }
    }

    /// Rewrite `text`, reporting why it could not be.
    pub async fn try_polish(&self, text: &str) -> Result<String, EnhanceError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(EnhanceError::MissingCredential)?;

        debug!("polishing {} chars with {}", text.len(), self.config.model);
        let response = self
            .http
            .post(self.url())
            .header(API_KEY_HEADER, api_key)
            .json(&GenerateContentRequest::from_prompt(build_prompt(text)))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(EnhanceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        gemini::parse_response(&body)
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint, self.config.model
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_wraps_draft_in_quotes() {
        assert_eq!(
            build_prompt("hey whats up"),
            "Rewrite the following chat message to be clear, friendly, and grammatically \
             correct. Do not add quotes or explanations, just output the polished text: \
             \"hey whats up\""
        );
    }

    #[test]
    fn test_url_uses_model_and_endpoint() {
        let client = PolishClient::new(
            EnhancerConfig::new(Some("key".into()))
                .with_model("gemini-test")
                .with_endpoint("http://localhost:8080/"),
        )
        .unwrap();
        assert_eq!(
            client.url(),
            "http://localhost:8080/v1beta/models/gemini-test:generateContent"
        );
    }

    #[tokio::test]
    async fn test_disabled_client_returns_draft() {
        let client = PolishClient::new(EnhancerConfig::new(None)).unwrap();
        assert!(!client.is_enabled());
        assert_eq!(client.polish("hey whats up").await, "hey whats up");
        assert!(matches!(
            client.try_polish("hey whats up").await,
            Err(EnhanceError::MissingCredential)
        ));
    }
}
