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

//! Shared types for peerchat: endpoint identities, chat messages and their
//! wire encoding, and the environment-driven feature flags.

pub mod clock;
pub mod feature_flags;
pub mod identity;
pub mod message;

pub use feature_flags::FeatureFlags;
pub use identity::Identity;
pub use message::{ChatMessage, Origin, WireError, WireMessage};
