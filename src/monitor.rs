use std::io::BufRead;

use log::{debug, info, warn};
use tokio::io::{AsyncBufRead, Lines};

use crate::capture::{parse_event, CaptureReader};
use crate::config::Config;
use crate::decoder::{Decoder, DecoderStats};
use crate::error::Result;
use crate::output::FrameSink;
use crate::spi::SpiEvent;

/// Feeds SPI events through the decoder and writes frames to a sink.
pub struct Monitor {
    config: Config,
    decoder: Decoder,
    sink: Box<dyn FrameSink>,
    line_number: usize,
}

impl Monitor {
    pub fn new(config: Config, sink: Box<dyn FrameSink>) -> Result<Self> {
        config.validate()?;
        Monitor::report_settings(&config);

        info!(
            "Decoding SPI mode {} captures, {:?} output",
            config.spi.mode(),
            config.output.format
        );

        Ok(Monitor {
            decoder: Decoder::new(config.decoder.emit_invalid)
                .with_strict_start(config.decoder.strict_start),
            config,
            sink,
            line_number: 0,
        })
    }

    fn report_settings(config: &Config) {
        for deviation in config.spi.check() {
            warn!("SPI settings: {}", deviation);
        }
    }

    /// Decodes one event, writing a frame if it completes one.
    pub fn process(&mut self, event: SpiEvent) -> Result<()> {
        let event = self.config.spi.normalize_event(event);
        debug!("event: {:?}", event);

        if let Some(frame) = self.decoder.decode(event) {
            self.sink.write_frame(&frame)?;
        }
        Ok(())
    }

    /// Decodes a whole capture.
    pub fn run_reader<R: BufRead>(&mut self, reader: R) -> Result<()> {
        for event in CaptureReader::new(reader) {
            self.process(event?)?;
        }
        self.finish()
    }

    /// Reads and decodes the next line of a streamed capture. Returns
    /// `false` once the input is exhausted.
    pub async fn poll<R>(&mut self, lines: &mut Lines<R>) -> Result<bool>
    where
        R: AsyncBufRead + Unpin,
    {
        let line = match lines.next_line().await? {
            Some(line) => line,
            None => return Ok(false),
        };
        self.line_number += 1;

        if let Some(event) = parse_event(&line, self.line_number)? {
            self.process(event)?;
            // a live stream is read by humans or pipes, don't hold frames back
            if matches!(event, SpiEvent::Disable { .. }) {
                self.sink.flush()?;
            }
        }
        Ok(true)
    }

    /// Flushes the sink and logs the totals.
    pub fn finish(&mut self) -> Result<()> {
        self.sink.flush()?;

        let stats = self.decoder.stats();
        info!(
            "{} transactions: {} valid, {} unknown command, {} invalid packet, {} short",
            stats.transactions,
            stats.valid_commands,
            stats.invalid_commands,
            stats.invalid_packets,
            stats.short_transactions
        );
        if stats.ignored_words > 0 {
            warn!("{} words outside any transaction were ignored", stats.ignored_words);
        }
        Ok(())
    }

    pub fn stats(&self) -> &DecoderStats {
        self.decoder.stats()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Applies a new configuration. The transaction in progress is dropped
    /// since its bytes may have been normalized differently. The output
    /// format is fixed for the lifetime of the sink.
    pub fn reload_config(&mut self, new_config: Config) -> Result<()> {
        new_config.validate()?;

        if new_config.output.format != self.config.output.format {
            warn!("Output format changes take effect on restart");
        }
        Monitor::report_settings(&new_config);

        self.decoder.reset();
        self.decoder.set_emit_invalid(new_config.decoder.emit_invalid);
        self.decoder.set_strict_start(new_config.decoder.strict_start);
        self.config = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }
}
