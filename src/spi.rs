//! SPI bus events as emitted by a logic analyzer's SPI decoder, and the
//! analyzer settings the PS2 controller protocol expects.

use serde::{Deserialize, Serialize};

use crate::error::{DecoderError, Result};

/// One event from the SPI analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SpiEvent {
    /// Chip select asserted.
    Enable { start_time: f64 },
    /// One word exchanged in both directions.
    Result {
        start_time: f64,
        end_time: f64,
        mosi: u8,
        miso: u8,
    },
    /// Chip select released.
    Disable { end_time: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitOrder {
    LsbFirst,
    MsbFirst,
}

/// Settings the capture's SPI analyzer was configured with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpiSettings {
    pub bit_order: BitOrder,
    pub word_size: u8,
    pub cpol: u8,
    pub cpha: u8,
}

impl Default for SpiSettings {
    fn default() -> Self {
        Self {
            bit_order: BitOrder::LsbFirst,
            word_size: 8,
            cpol: 1,
            cpha: 1,
        }
    }
}

impl SpiSettings {
    /// SPI mode number (0-3) derived from clock polarity and phase.
    pub fn mode(&self) -> u8 {
        (self.cpol << 1) | self.cpha
    }

    /// Rejects settings the decoder cannot work with at all.
    pub fn validate(&self) -> Result<()> {
        if self.word_size != 8 {
            return Err(DecoderError::InvalidConfig(format!(
                "word size must be 8 bits, got {}",
                self.word_size
            )));
        }
        if self.cpol > 1 || self.cpha > 1 {
            return Err(DecoderError::InvalidConfig(format!(
                "cpol and cpha must be 0 or 1, got cpol={} cpha={}",
                self.cpol, self.cpha
            )));
        }
        Ok(())
    }

    /// Lists every way these settings differ from what a PS2 controller
    /// uses on the wire. The capture may still decode, but bytes sampled on
    /// the wrong clock edge will be garbage.
    pub fn check(&self) -> Vec<String> {
        let expected = SpiSettings::default();
        let mut deviations = Vec::new();

        if self.bit_order != expected.bit_order {
            deviations.push(
                "capture decoded MSB first, bytes will be bit-reversed before decoding".to_string(),
            );
        }
        if self.cpol != expected.cpol {
            deviations.push(format!("clock polarity is {}, controller uses 1", self.cpol));
        }
        if self.cpha != expected.cpha {
            deviations.push(format!("clock phase is {}, controller uses 1", self.cpha));
        }

        deviations
    }

    /// Brings a word into LSB-first order.
    pub fn normalize(&self, word: u8) -> u8 {
        match self.bit_order {
            BitOrder::LsbFirst => word,
            BitOrder::MsbFirst => word.reverse_bits(),
        }
    }

    /// Applies [`normalize`](Self::normalize) to both lines of a result event.
    pub fn normalize_event(&self, event: SpiEvent) -> SpiEvent {
        match event {
            SpiEvent::Result {
                start_time,
                end_time,
                mosi,
                miso,
            } => SpiEvent::Result {
                start_time,
                end_time,
                mosi: self.normalize(mosi),
                miso: self.normalize(miso),
            },
            other => other,
        }
    }
}
