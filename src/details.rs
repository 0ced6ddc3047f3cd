//! Interpretation of the payload bytes of each command.
//!
//! Detail decoding never fails a frame: when the transaction ended before a
//! byte we need, the detail is [`Unavailable`](CommandDetails::Unavailable).

use std::fmt;

use serde::Serialize;

use crate::protocol::{Buttons, CommandId, ControllerMode};

/// What the console asked for, beyond the command id itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommandDetails {
    None,
    /// Main polling with rumble motor values.
    Motors { small: bool, large: bool },
    ConfigMode { enter: bool },
    SetMode { analog: bool, locked: bool },
    DescriptorOffset(u8),
    MotorMapping { small: bool, large: bool },
    Unavailable,
}

/// What the controller answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataDetails {
    Buttons(Buttons),
    NoData,
    Elided,
    Unavailable,
}

impl CommandDetails {
    pub fn decode(command: CommandId, command_bytes: &[u8]) -> Self {
        let arg = |index: usize| command_bytes.get(index).copied();

        let details = match command {
            CommandId::MainPolling => match (arg(3), arg(4)) {
                (Some(0), Some(0)) => Some(CommandDetails::None),
                (Some(small), Some(large)) => Some(CommandDetails::Motors {
                    small: small == 0xFF,
                    large: large >= 0x40,
                }),
                _ => None,
            },
            CommandId::ConfigMode => arg(3).map(|enter| CommandDetails::ConfigMode {
                enter: enter == 0x01,
            }),
            CommandId::SetAnalogMode => match (arg(3), arg(4)) {
                (Some(analog), Some(locked)) => Some(CommandDetails::SetMode {
                    analog: analog == 0x01,
                    locked: locked == 0x03,
                }),
                _ => None,
            },
            CommandId::DeviceDescriptor46 | CommandId::DeviceDescriptor4C => {
                arg(3).map(CommandDetails::DescriptorOffset)
            }
            CommandId::MapMotors => match (arg(3), arg(4)) {
                (Some(small), Some(large)) => Some(CommandDetails::MotorMapping {
                    small: small == 0x00,
                    large: large == 0x01,
                }),
                _ => None,
            },
            _ => Some(CommandDetails::None),
        };

        details.unwrap_or(CommandDetails::Unavailable)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CommandDetails::None)
    }
}

impl DataDetails {
    pub fn decode(command: CommandId, data_bytes: &[u8]) -> Self {
        match command {
            CommandId::MainPolling => Self::buttons(data_bytes),
            CommandId::ConfigMode => {
                // no button data while in config mode
                match data_bytes.get(1).map(|&mode| ControllerMode::from_byte(mode)) {
                    Some(ControllerMode::Config) => DataDetails::NoData,
                    Some(_) => Self::buttons(data_bytes),
                    None => DataDetails::Unavailable,
                }
            }
            _ => DataDetails::Elided,
        }
    }

    fn buttons(data_bytes: &[u8]) -> Self {
        match (data_bytes.get(3), data_bytes.get(4)) {
            (Some(&lo), Some(&hi)) => DataDetails::Buttons(Buttons::from_response(lo, hi)),
            _ => DataDetails::Unavailable,
        }
    }
}

fn bool_word(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

impl fmt::Display for CommandDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandDetails::None => Ok(()),
            CommandDetails::Motors { small, large } => write!(
                f,
                "Small Motor {}, Large Motor {}",
                bool_word(*small),
                bool_word(*large)
            ),
            CommandDetails::ConfigMode { enter } => {
                f.write_str(if *enter { "Enter" } else { "Exit" })
            }
            CommandDetails::SetMode { analog, locked } => {
                f.write_str(if *analog { "Set Analog" } else { "Set Digital" })?;
                if *locked {
                    f.write_str(" (Locked)")?;
                }
                Ok(())
            }
            CommandDetails::DescriptorOffset(offset) => f.write_str(match offset {
                0 => "First Byte",
                1 => "Second Byte",
                _ => "Unknown Byte",
            }),
            CommandDetails::MotorMapping { small, large } => write!(
                f,
                "{} Small, {} Large",
                if *small { "Map" } else { "Unmap" },
                if *large { "Map" } else { "Unmap" }
            ),
            CommandDetails::Unavailable => f.write_str("(error)"),
        }
    }
}

impl fmt::Display for DataDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataDetails::Buttons(buttons) if buttons.is_empty() => f.write_str("(no buttons)"),
            DataDetails::Buttons(buttons) => f.write_str(&buttons.names().join(", ")),
            DataDetails::NoData => f.write_str("(no data)"),
            DataDetails::Elided => f.write_str("(...)"),
            DataDetails::Unavailable => f.write_str("(error)"),
        }
    }
}
