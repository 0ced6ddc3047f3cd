//! Per-transaction decoding state machine.
//!
//! The decoder is fed the SPI analyzer's events in order. An `enable` opens a
//! transaction, each `result` appends one command/data byte pair and a
//! `disable` closes it, at which point a [`Frame`] may be produced.

use log::debug;

use crate::details::{CommandDetails, DataDetails};
use crate::frame::{Frame, FrameKind};
use crate::protocol::{AnalogSticks, CommandId, ControllerMode, HEADER_LEN, READY_BYTE, START_BYTE};
use crate::spi::SpiEvent;

/// Running totals over everything the decoder has seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoderStats {
    pub transactions: u64,
    pub valid_commands: u64,
    pub invalid_commands: u64,
    pub invalid_packets: u64,
    /// Transactions closed before the command id was exchanged.
    pub short_transactions: u64,
    /// Words received outside of any transaction.
    pub ignored_words: u64,
}

pub struct Decoder {
    emit_invalid: bool,
    strict_start: bool,
    start_time: Option<f64>,
    kind: Option<FrameKind>,
    command_id: u8,
    mode: u8,
    command_bytes: Vec<u8>,
    data_bytes: Vec<u8>,
    stats: DecoderStats,
}

impl Decoder {
    /// With `emit_invalid` set, transactions with an unknown command or bad
    /// start byte are reported as frames too instead of being dropped.
    pub fn new(emit_invalid: bool) -> Self {
        Decoder {
            emit_invalid,
            strict_start: false,
            start_time: None,
            kind: None,
            command_id: 0,
            mode: 0,
            command_bytes: Vec::new(),
            data_bytes: Vec::new(),
            stats: DecoderStats::default(),
        }
    }

    /// With `strict_start` set, a transaction whose first command byte is
    /// not the start byte stays an invalid packet. Otherwise the command id
    /// in the second word decides, whatever the first byte was.
    pub fn with_strict_start(mut self, strict_start: bool) -> Self {
        self.strict_start = strict_start;
        self
    }

    pub fn set_emit_invalid(&mut self, emit_invalid: bool) {
        self.emit_invalid = emit_invalid;
    }

    pub fn set_strict_start(&mut self, strict_start: bool) {
        self.strict_start = strict_start;
    }

    /// Drops the transaction in progress. Statistics are kept.
    pub fn reset(&mut self) {
        self.start_time = None;
        self.kind = None;
        self.command_id = 0;
        self.mode = 0;
        self.command_bytes.clear();
        self.data_bytes.clear();
    }

    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    pub fn in_transaction(&self) -> bool {
        self.start_time.is_some()
    }

    pub fn decode(&mut self, event: SpiEvent) -> Option<Frame> {
        match event {
            SpiEvent::Enable { start_time } => {
                if self.in_transaction() {
                    debug!(
                        "enable at {} while transaction open, dropping {} bytes",
                        start_time,
                        self.command_bytes.len()
                    );
                }
                self.reset();
                self.start_time = Some(start_time);
                None
            }
            SpiEvent::Result { mosi, miso, .. } => {
                self.push_word(mosi, miso);
                None
            }
            SpiEvent::Disable { end_time } => {
                let frame = self.finish(end_time);
                self.reset();
                frame
            }
        }
    }

    fn push_word(&mut self, command: u8, data: u8) {
        if !self.in_transaction() {
            self.stats.ignored_words += 1;
            debug!("ignoring word {:02X}/{:02X} outside transaction", command, data);
            return;
        }

        match self.command_bytes.len() {
            0 if command != START_BYTE => {
                self.kind = Some(FrameKind::InvalidPacket);
            }
            1 => {
                self.command_id = command;
                self.mode = data;

                if !(self.strict_start && self.kind == Some(FrameKind::InvalidPacket)) {
                    self.kind = Some(match CommandId::from_byte(command) {
                        Some(_) => FrameKind::ValidCommand,
                        None => FrameKind::InvalidCommand,
                    });
                }
            }
            _ => {}
        }

        self.command_bytes.push(command);
        self.data_bytes.push(data);
    }

    fn finish(&mut self, end_time: f64) -> Option<Frame> {
        let start_time = self.start_time?;
        self.stats.transactions += 1;

        if self.command_bytes.len() < 2 {
            self.stats.short_transactions += 1;
            debug!("transaction at {} closed after {} bytes", start_time, self.command_bytes.len());
            return None;
        }

        let kind = self.kind?;
        match kind {
            FrameKind::ValidCommand => self.stats.valid_commands += 1,
            FrameKind::InvalidCommand => self.stats.invalid_commands += 1,
            FrameKind::InvalidPacket => self.stats.invalid_packets += 1,
        }

        if kind != FrameKind::ValidCommand && !self.emit_invalid {
            debug!("dropping {} transaction at {}", kind.as_str(), start_time);
            return None;
        }

        Some(self.build_frame(kind, start_time, end_time))
    }

    fn build_frame(&mut self, kind: FrameKind, start_time: f64, end_time: f64) -> Frame {
        let mode = ControllerMode::from_byte(self.mode);
        let command = match kind {
            FrameKind::ValidCommand => CommandId::from_byte(self.command_id),
            _ => None,
        };

        let command_details =
            command.map(|command| CommandDetails::decode(command, &self.command_bytes));
        let data_details = command.map(|command| DataDetails::decode(command, &self.data_bytes));

        let ready = self.data_bytes.get(2) == Some(&READY_BYTE);
        let truncated = mode
            .payload_len()
            .map_or(false, |len| self.data_bytes.len() < HEADER_LEN + len);
        let analog = match command {
            Some(CommandId::MainPolling) if mode.has_sticks() => {
                AnalogSticks::from_response(&self.data_bytes)
            }
            _ => None,
        };

        let frame = Frame {
            kind,
            start_time,
            end_time,
            command_id: self.command_id,
            command,
            mode,
            command_details,
            data_details,
            command_bytes: std::mem::take(&mut self.command_bytes),
            data_bytes: std::mem::take(&mut self.data_bytes),
            ready,
            truncated,
            analog,
        };

        debug!("decoded frame: {:?}", frame);
        frame
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Buttons;

    /// Runs one whole transaction through the decoder.
    fn transact(decoder: &mut Decoder, t: f64, command: &[u8], data: &[u8]) -> Option<Frame> {
        assert!(decoder.decode(SpiEvent::Enable { start_time: t }).is_none());
        for (i, (&mosi, &miso)) in command.iter().zip(data).enumerate() {
            let at = t + 0.001 * (i as f64 + 1.0);
            let event = SpiEvent::Result {
                start_time: at,
                end_time: at + 0.0005,
                mosi,
                miso,
            };
            assert!(decoder.decode(event).is_none());
        }
        decoder.decode(SpiEvent::Disable { end_time: t + 0.1 })
    }

    #[test]
    fn test_digital_poll() {
        let mut decoder = Decoder::default();
        let frame = transact(
            &mut decoder,
            1.0,
            &[0x01, 0x42, 0x00, 0x00, 0x00],
            &[0xFF, 0x41, 0x5A, 0xF7, 0xBF],
        )
        .unwrap();

        assert!(frame.is_valid());
        assert_eq!(frame.command, Some(CommandId::MainPolling));
        assert_eq!(frame.mode, ControllerMode::Digital);
        assert_eq!(
            frame.data_details,
            Some(DataDetails::Buttons(Buttons::START | Buttons::CROSS))
        );
        assert!(frame.ready);
        assert!(!frame.truncated);
        assert!(frame.analog.is_none());
        assert_eq!(frame.start_time, 1.0);
        assert!((frame.duration() - 0.1).abs() < 1e-9);
        assert_eq!(
            frame.to_string(),
            "🎮 Controller Mode: Digital (41) — ⬇ Command: Main Polling (42)  — ⬆ Data: Start, ✖"
        );
        assert_eq!(decoder.stats().valid_commands, 1);
    }

    #[test]
    fn test_analog_poll_reports_sticks() {
        let mut decoder = Decoder::default();
        let frame = transact(
            &mut decoder,
            0.0,
            &[0x01, 0x42, 0x00, 0xFF, 0x80, 0x00, 0x00, 0x00, 0x00],
            &[0xFF, 0x73, 0x5A, 0xFF, 0xFF, 0x80, 0x80, 0x00, 0xFF],
        )
        .unwrap();

        assert_eq!(frame.mode, ControllerMode::Analog);
        let sticks = frame.analog.unwrap();
        assert_eq!(sticks.left_x, 0x00);
        assert_eq!(sticks.left_y, 0xFF);
        assert_eq!(
            frame.to_string(),
            "🎮 Controller Mode: Analog (73) — ⬇ Command: Main Polling (42)  - Small Motor True, Large Motor True — ⬆ Data: (no buttons)"
        );
    }

    #[test]
    fn test_unknown_command_dropped() {
        let mut decoder = Decoder::default();
        assert!(transact(&mut decoder, 0.0, &[0x01, 0x48, 0x00], &[0xFF, 0x41, 0x5A]).is_none());
        assert_eq!(decoder.stats().invalid_commands, 1);

        decoder.set_emit_invalid(true);
        let frame = transact(&mut decoder, 1.0, &[0x01, 0x48, 0x00], &[0xFF, 0x41, 0x5A]).unwrap();
        assert_eq!(frame.kind, FrameKind::InvalidCommand);
        assert_eq!(frame.command_id, 0x48);
        assert!(frame.command_details.is_none());
        assert_eq!(
            frame.to_string(),
            "🎮 Controller Mode: Digital (41) — ⬇ Command: Unknown Command (48)"
        );
    }

    #[test]
    fn test_command_id_decides_after_bad_start_byte() {
        let mut decoder = Decoder::default();
        let frame = transact(
            &mut decoder,
            0.0,
            &[0x81, 0x42, 0x00, 0x00, 0x00],
            &[0xFF, 0x41, 0x5A, 0xFF, 0xFF],
        )
        .unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.command, Some(CommandId::MainPolling));
        assert_eq!(
            frame.to_string(),
            "🎮 Controller Mode: Digital (41) — ⬇ Command: Main Polling (42)  — ⬆ Data: (no buttons)"
        );
        assert_eq!(decoder.stats().valid_commands, 1);
        assert_eq!(decoder.stats().invalid_packets, 0);
    }

    #[test]
    fn test_strict_start_byte() {
        let mut decoder = Decoder::new(true).with_strict_start(true);
        let frame = transact(
            &mut decoder,
            0.0,
            &[0x81, 0x42, 0x00, 0x00, 0x00],
            &[0xFF, 0x41, 0x5A, 0xFF, 0xFF],
        )
        .unwrap();
        assert_eq!(frame.kind, FrameKind::InvalidPacket);
        assert!(frame.command.is_none());
        assert_eq!(frame.to_string(), "⚠ Invalid packet: start byte 81 (5 bytes)");
        assert_eq!(decoder.stats().invalid_packets, 1);
        assert_eq!(decoder.stats().valid_commands, 0);

        // without emit_invalid the packet is counted but not reported
        decoder.set_emit_invalid(false);
        assert!(transact(&mut decoder, 1.0, &[0x00, 0x42, 0x00], &[0xFF, 0x41, 0x5A]).is_none());
        assert_eq!(decoder.stats().invalid_packets, 2);
    }

    #[test]
    fn test_words_before_enable_ignored() {
        let mut decoder = Decoder::default();
        let stray = SpiEvent::Result {
            start_time: 0.0,
            end_time: 0.1,
            mosi: 0x01,
            miso: 0xFF,
        };
        assert!(decoder.decode(stray).is_none());
        assert!(decoder.decode(SpiEvent::Disable { end_time: 0.2 }).is_none());
        assert_eq!(decoder.stats().ignored_words, 1);
        assert_eq!(decoder.stats().transactions, 0);
    }

    #[test]
    fn test_short_transactions() {
        let mut decoder = Decoder::new(true);
        assert!(transact(&mut decoder, 0.0, &[0x01], &[0xFF]).is_none());
        assert!(transact(&mut decoder, 1.0, &[], &[]).is_none());
        assert_eq!(decoder.stats().short_transactions, 2);

        // too short for the details, the frame is still produced
        let frame = transact(&mut decoder, 2.0, &[0x01, 0x44], &[0xFF, 0xF3]).unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.command_details, Some(CommandDetails::Unavailable));
        assert!(frame.truncated);
        assert!(!frame.ready);
        assert!(frame.to_string().contains("Switch Analog/Digital Mode (44)  - (error) — ⬆ Data: (...)"));
    }

    #[test]
    fn test_enable_restarts_transaction() {
        let mut decoder = Decoder::default();
        decoder.decode(SpiEvent::Enable { start_time: 0.0 });
        decoder.decode(SpiEvent::Result {
            start_time: 0.1,
            end_time: 0.2,
            mosi: 0x55,
            miso: 0xFF,
        });

        let frame = transact(
            &mut decoder,
            1.0,
            &[0x01, 0x43, 0x00, 0x01, 0x00],
            &[0xFF, 0x41, 0x5A, 0xFF, 0xFF],
        )
        .unwrap();
        assert_eq!(frame.command_bytes, vec![0x01, 0x43, 0x00, 0x01, 0x00]);
        assert_eq!(frame.command_details, Some(CommandDetails::ConfigMode { enter: true }));
        assert_eq!(frame.start_time, 1.0);
    }
}
