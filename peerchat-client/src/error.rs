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

use crate::lifecycle::LifecycleState;
use thiserror::Error;

/// Why a user intent was refused. A refused intent changes no state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentError {
    #[error("no target identity given")]
    EmptyTarget,

    #[error("waiting for the relay to assign an identity")]
    NotRegistered,

    #[error("cannot start a connection while {0}")]
    Busy(LifecycleState),

    #[error("not connected")]
    NotConnected,

    #[error("chat client has shut down")]
    ClientClosed,
}
