//! Where decoded frames go.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::frame::Frame;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {}", other)),
        }
    }
}

pub trait FrameSink {
    fn write_frame(&mut self, frame: &Frame) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;
}

/// One human readable line per frame: the start time in seconds, a tab, the
/// frame's display line and, for analog polls, the stick positions.
pub struct TextSink<W> {
    writer: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(writer: W) -> Self {
        TextSink { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> FrameSink for TextSink<W> {
    fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        write!(self.writer, "{:.6}\t{}", frame.start_time, frame)?;
        if let Some(sticks) = &frame.analog {
            write!(
                self.writer,
                " [L {:02X},{:02X} R {:02X},{:02X}]",
                sticks.left_x, sticks.left_y, sticks.right_x, sticks.right_y
            )?;
        }
        writeln!(self.writer)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// JSON Lines, one object per frame.
pub struct JsonSink<W> {
    writer: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        JsonSink { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> FrameSink for JsonSink<W> {
    fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        let value = json!({
            "frame": frame,
            "mode_string": frame.mode.name(),
            "mode_id": format!("{:02X}", frame.mode.byte()),
            "command_name": frame.command_name(),
            "command_id": format!("{:02X}", frame.command_id),
            "command_details": frame.command_details.map(|d| d.to_string()),
            "data_details": frame.data_details.map(|d| d.to_string()),
            "summary": frame.to_string(),
        });

        serde_json::to_writer(&mut self.writer, &value)?;
        writeln!(self.writer)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Boxes the sink matching `format` around `writer`.
pub fn sink_for<W: Write + 'static>(format: OutputFormat, writer: W) -> Box<dyn FrameSink> {
    match format {
        OutputFormat::Text => Box::new(TextSink::new(writer)),
        OutputFormat::Json => Box::new(JsonSink::new(writer)),
    }
}
