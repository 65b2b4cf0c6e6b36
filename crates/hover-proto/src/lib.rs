//! Wire vocabulary shared by every hover crate: the text commands understood
//! by the vehicle, the normalized control records that feed them and the
//! parsers for the few replies the vehicle sends back.

pub mod command;
pub mod rc;
pub mod telemetry;

pub use command::{Command, CommandError, Direction, Rotation};
pub use rc::{Intent, RcCommand};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Health of one channel (video, or the command link once its socket exists).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    #[default]
    NotConnected,
    Connected,
    Disconnected,
    ReadError,
    FrameError,
}

impl ConnectionStatus {
    pub fn is_connected(self) -> bool {
        self == ConnectionStatus::Connected
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::NotConnected => "not-connected",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::ReadError => "read-error",
            ConnectionStatus::FrameError => "frame-error",
        };
        f.write_str(s)
    }
}
