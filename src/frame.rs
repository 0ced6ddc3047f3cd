use std::fmt;

use serde::Serialize;

use crate::details::{CommandDetails, DataDetails};
use crate::protocol::{AnalogSticks, CommandId, ControllerMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FrameKind {
    ValidCommand,
    InvalidCommand,
    InvalidPacket,
}

impl FrameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameKind::ValidCommand => "valid-command",
            FrameKind::InvalidCommand => "invalid-command",
            FrameKind::InvalidPacket => "invalid-packet",
        }
    }
}

/// One decoded chip-select window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub kind: FrameKind,
    pub start_time: f64,
    pub end_time: f64,
    /// Raw command id byte, also set when the id is unknown.
    pub command_id: u8,
    pub command: Option<CommandId>,
    pub mode: ControllerMode,
    pub command_details: Option<CommandDetails>,
    pub data_details: Option<DataDetails>,
    pub command_bytes: Vec<u8>,
    pub data_bytes: Vec<u8>,
    /// Controller answered the ready byte in the header.
    pub ready: bool,
    /// Fewer payload bytes than the controller mode announces.
    pub truncated: bool,
    pub analog: Option<AnalogSticks>,
}

impl Frame {
    pub fn is_valid(&self) -> bool {
        self.kind == FrameKind::ValidCommand
    }

    pub fn command_name(&self) -> &'static str {
        self.command
            .map(|command| command.name())
            .unwrap_or("Unknown Command")
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == FrameKind::InvalidPacket {
            return write!(
                f,
                "⚠ Invalid packet: start byte {:02X} ({} bytes)",
                self.command_bytes.first().copied().unwrap_or_default(),
                self.command_bytes.len()
            );
        }

        write!(
            f,
            "🎮 Controller Mode: {} ({:02X}) — ⬇ Command: {} ({:02X})",
            self.mode.name(),
            self.mode.byte(),
            self.command_name(),
            self.command_id,
        )?;

        // unknown commands carry no details
        let data = match &self.data_details {
            Some(data) => data,
            None => return Ok(()),
        };

        // the analyzer's template always leaves a space for the details
        f.write_str(" ")?;
        if let Some(details) = self.command_details.filter(|details| !details.is_empty()) {
            write!(f, " - {}", details)?;
        }
        write!(f, " — ⬆ Data: {}", data)
    }
}
