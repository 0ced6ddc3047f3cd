/// PS2 controller protocol decoder for SPI analyzer captures.
///
/// This library turns the event stream of an SPI analyzer (chip select
/// enable, exchanged words, chip select disable) into decoded PS2 controller
/// command/response frames.

pub mod capture;
pub mod config;
pub mod decoder;
pub mod details;
pub mod error;
pub mod frame;
pub mod monitor;
pub mod output;
pub mod protocol;
pub mod spi;

// Re-export main types for convenience
pub use config::Config;
pub use decoder::{Decoder, DecoderStats};
pub use error::{DecoderError, Result};
pub use frame::{Frame, FrameKind};
pub use monitor::Monitor;
pub use spi::SpiEvent;
