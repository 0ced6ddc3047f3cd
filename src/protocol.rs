//! PS2 controller protocol tables.
//!
//! Every transaction starts with the console sending [`START_BYTE`] while the
//! controller answers with filler. The second word carries the command id on
//! MOSI and the controller's current mode on MISO. On the third word the
//! controller answers [`READY_BYTE`]; the payload follows.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

pub const START_BYTE: u8 = 0x01;
pub const READY_BYTE: u8 = 0x5A;
pub const HEADER_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandId {
    InitializePressureSensors,
    ButtonInclusions,
    MainPolling,
    ConfigMode,
    SetAnalogMode,
    StatusInfo,
    DeviceDescriptor46,
    DeviceDescriptor47,
    DeviceDescriptor4C,
    MapMotors,
    ConfigureAnalogResponse,
}

impl CommandId {
    pub fn from_byte(byte: u8) -> Option<Self> {
        use CommandId::*;

        let id = match byte {
            0x40 => InitializePressureSensors,
            0x41 => ButtonInclusions,
            0x42 => MainPolling,
            0x43 => ConfigMode,
            0x44 => SetAnalogMode,
            0x45 => StatusInfo,
            0x46 => DeviceDescriptor46,
            0x47 => DeviceDescriptor47,
            0x4C => DeviceDescriptor4C,
            0x4D => MapMotors,
            0x4F => ConfigureAnalogResponse,
            _ => return None,
        };
        Some(id)
    }

    pub fn id(&self) -> u8 {
        use CommandId::*;

        match self {
            InitializePressureSensors => 0x40,
            ButtonInclusions => 0x41,
            MainPolling => 0x42,
            ConfigMode => 0x43,
            SetAnalogMode => 0x44,
            StatusInfo => 0x45,
            DeviceDescriptor46 => 0x46,
            DeviceDescriptor47 => 0x47,
            DeviceDescriptor4C => 0x4C,
            MapMotors => 0x4D,
            ConfigureAnalogResponse => 0x4F,
        }
    }

    pub fn name(&self) -> &'static str {
        use CommandId::*;

        match self {
            InitializePressureSensors => "Initialize Pressure Sensors",
            ButtonInclusions => "Button Inclusions",
            MainPolling => "Main Polling",
            ConfigMode => "Enter/Exit Config Mode",
            SetAnalogMode => "Switch Analog/Digital Mode",
            StatusInfo => "Get Status Info",
            DeviceDescriptor46 | DeviceDescriptor47 | DeviceDescriptor4C => "Device Descriptor",
            MapMotors => "Map Rumble Motors",
            ConfigureAnalogResponse => "Configure Analog Response",
        }
    }
}

/// Mode the controller reports in the second response byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerMode {
    Digital,
    Analog,
    AnalogPressure,
    Config,
    Unknown(u8),
}

impl ControllerMode {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x41 => ControllerMode::Digital,
            0x73 => ControllerMode::Analog,
            0x79 => ControllerMode::AnalogPressure,
            0xF3 => ControllerMode::Config,
            other => ControllerMode::Unknown(other),
        }
    }

    pub fn byte(&self) -> u8 {
        match self {
            ControllerMode::Digital => 0x41,
            ControllerMode::Analog => 0x73,
            ControllerMode::AnalogPressure => 0x79,
            ControllerMode::Config => 0xF3,
            ControllerMode::Unknown(byte) => *byte,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ControllerMode::Digital => "Digital",
            ControllerMode::Analog => "Analog",
            ControllerMode::AnalogPressure => "Analog with Pressure",
            ControllerMode::Config => "Configuration",
            ControllerMode::Unknown(_) => "Unknown Mode",
        }
    }

    /// Number of payload bytes after the header. The low nibble of the mode
    /// byte counts 16-bit words. `None` for modes we don't recognise.
    pub fn payload_len(&self) -> Option<usize> {
        match self {
            ControllerMode::Unknown(_) => None,
            known => Some(usize::from(known.byte() & 0x0F) * 2),
        }
    }

    /// Whether main polling responses carry stick positions.
    pub fn has_sticks(&self) -> bool {
        matches!(self, ControllerMode::Analog | ControllerMode::AnalogPressure)
    }
}

const BUTTON_NAMES: [&str; 16] = [
    "Select", "L3", "R3", "Start", "D-Up", "D-Right", "D-Down", "D-Left", "L2", "R2", "L1", "R1",
    "🔺", "⚪", "✖", "⬛",
];

bitflags! {
    /// Pressed digital buttons. Bits 0-7 come from response byte 3, bits
    /// 8-15 from response byte 4.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Buttons: u16 {
        const SELECT = 1 << 0;
        const L3 = 1 << 1;
        const R3 = 1 << 2;
        const START = 1 << 3;
        const UP = 1 << 4;
        const RIGHT = 1 << 5;
        const DOWN = 1 << 6;
        const LEFT = 1 << 7;
        const L2 = 1 << 8;
        const R2 = 1 << 9;
        const L1 = 1 << 10;
        const R1 = 1 << 11;
        const TRIANGLE = 1 << 12;
        const CIRCLE = 1 << 13;
        const CROSS = 1 << 14;
        const SQUARE = 1 << 15;
    }
}

impl Buttons {
    /// Buttons are active low on the wire.
    pub fn from_response(lo: u8, hi: u8) -> Self {
        Buttons::from_bits_truncate(!u16::from_le_bytes([lo, hi]))
    }

    /// Display names of the pressed buttons in wire order.
    pub fn names(&self) -> Vec<&'static str> {
        BUTTON_NAMES
            .iter()
            .enumerate()
            .filter(|(bit, _)| self.bits() & (1 << bit) != 0)
            .map(|(_, name)| *name)
            .collect()
    }
}

/// Stick positions, 0x00 is fully left/up and 0xFF fully right/down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalogSticks {
    pub right_x: u8,
    pub right_y: u8,
    pub left_x: u8,
    pub left_y: u8,
}

impl AnalogSticks {
    pub fn from_response(data: &[u8]) -> Option<Self> {
        match data.get(5..9) {
            Some(&[right_x, right_y, left_x, left_y]) => Some(AnalogSticks {
                right_x,
                right_y,
                left_x,
                left_y,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_table() {
        for byte in 0u8..=0xFF {
            if let Some(cmd) = CommandId::from_byte(byte) {
                assert_eq!(cmd.id(), byte);
            }
        }
        assert_eq!(CommandId::from_byte(0x42).unwrap().name(), "Main Polling");
        assert_eq!(CommandId::from_byte(0x4C).unwrap().name(), "Device Descriptor");
        assert!(CommandId::from_byte(0x48).is_none());
        assert!(CommandId::from_byte(0x01).is_none());
    }

    #[test]
    fn test_modes() {
        assert_eq!(ControllerMode::from_byte(0x73).name(), "Analog");
        assert_eq!(ControllerMode::from_byte(0x12).name(), "Unknown Mode");
        assert_eq!(ControllerMode::from_byte(0x12).byte(), 0x12);
        assert_eq!(ControllerMode::Digital.payload_len(), Some(2));
        assert_eq!(ControllerMode::Analog.payload_len(), Some(6));
        assert_eq!(ControllerMode::AnalogPressure.payload_len(), Some(18));
        assert_eq!(ControllerMode::Config.payload_len(), Some(6));
        assert_eq!(ControllerMode::Unknown(0xFF).payload_len(), None);
    }

    #[test]
    fn test_buttons_active_low() {
        assert!(Buttons::from_response(0xFF, 0xFF).is_empty());

        let pressed = Buttons::from_response(0xF7, 0xBF);
        assert_eq!(pressed, Buttons::START | Buttons::CROSS);
        assert_eq!(pressed.names(), vec!["Start", "✖"]);
    }

    #[test]
    fn test_sticks() {
        let data = [0xFF, 0x73, 0x5A, 0xFF, 0xFF, 0x80, 0x7F, 0x00, 0xFF];
        let sticks = AnalogSticks::from_response(&data).unwrap();
        assert_eq!(sticks.right_x, 0x80);
        assert_eq!(sticks.left_y, 0xFF);
        assert!(AnalogSticks::from_response(&data[..8]).is_none());
    }
}
