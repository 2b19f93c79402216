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

use thiserror::Error;

/// Errors returned by [`PolishClient::try_polish`](crate::PolishClient::try_polish).
#[derive(Debug, Error)]
pub enum EnhanceError {
    /// No API key was configured.
    #[error("text enhancement is disabled: no API key configured")]
    MissingCredential,

    /// The API answered with a non-success status.
    #[error("enhancement API error ({status}): {body}")]
    Status { status: u16, body: String },

    /// The response carried no usable text.
    #[error("enhancement API returned no text")]
    EmptyResponse,

    #[error("malformed enhancement response: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A network or transport error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}
