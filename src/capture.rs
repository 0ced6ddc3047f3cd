//! Reading SPI analyzer exports.
//!
//! A capture is JSON Lines, one analyzer event per line:
//!
//! ```text
//! {"type":"enable","start_time":0.0125}
//! {"type":"result","start_time":0.0126,"end_time":0.0127,"mosi":[1],"miso":[255]}
//! {"type":"disable","end_time":0.0131}
//! ```
//!
//! `mosi` and `miso` may be plain integers or one-byte arrays.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;

use crate::error::{DecoderError, Result};
use crate::spi::SpiEvent;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Word {
    Byte(u8),
    Bytes(Vec<u8>),
}

impl Word {
    fn into_byte(self, line: usize) -> Result<u8> {
        match self {
            Word::Byte(byte) => Ok(byte),
            Word::Bytes(bytes) => match bytes.as_slice() {
                &[byte] => Ok(byte),
                other => Err(DecoderError::InvalidWord {
                    line,
                    len: other.len(),
                }),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ExportEvent {
    Enable {
        start_time: f64,
    },
    Result {
        start_time: f64,
        end_time: f64,
        mosi: Word,
        miso: Word,
    },
    Disable {
        end_time: f64,
    },
}

/// Parses one line of a capture. Blank lines and `#` comments yield `None`.
pub fn parse_event(line: &str, line_number: usize) -> Result<Option<SpiEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let event: ExportEvent =
        serde_json::from_str(line).map_err(|source| DecoderError::Json {
            line: line_number,
            source,
        })?;

    let event = match event {
        ExportEvent::Enable { start_time } => SpiEvent::Enable { start_time },
        ExportEvent::Result {
            start_time,
            end_time,
            mosi,
            miso,
        } => SpiEvent::Result {
            start_time,
            end_time,
            mosi: mosi.into_byte(line_number)?,
            miso: miso.into_byte(line_number)?,
        },
        ExportEvent::Disable { end_time } => SpiEvent::Disable { end_time },
    };

    Ok(Some(event))
}

/// Iterates over the events of a capture.
pub struct CaptureReader<R> {
    reader: R,
    line_number: usize,
    buffer: String,
}

impl<R: BufRead> CaptureReader<R> {
    pub fn new(reader: R) -> Self {
        CaptureReader {
            reader,
            line_number: 0,
            buffer: String::new(),
        }
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

impl CaptureReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(CaptureReader::new(BufReader::new(file)))
    }
}

impl<R: BufRead> Iterator for CaptureReader<R> {
    type Item = Result<SpiEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buffer.clear();
            match self.reader.read_line(&mut self.buffer) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_number += 1;
                    match parse_event(&self.buffer, self.line_number) {
                        Ok(Some(event)) => return Some(Ok(event)),
                        Ok(None) => continue,
                        Err(e) => return Some(Err(e)),
                    }
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

/// Reads a whole capture file into memory.
pub fn read_capture<P: AsRef<Path>>(path: P) -> Result<Vec<SpiEvent>> {
    CaptureReader::open(path)?.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const CAPTURE: &str = r#"
# one main poll
{"type":"enable","start_time":0.5}
{"type":"result","start_time":0.5,"end_time":0.625,"mosi":[1],"miso":[255]}
{"type":"result","start_time":0.75,"end_time":0.875,"mosi":66,"miso":65}
{"type":"disable","end_time":1.0}
"#;

    #[test]
    fn test_reader() {
        let events: Vec<SpiEvent> = CaptureReader::new(Cursor::new(CAPTURE))
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(events.len(), 4);
        assert_eq!(events[0], SpiEvent::Enable { start_time: 0.5 });
        assert_eq!(
            events[2],
            SpiEvent::Result {
                start_time: 0.75,
                end_time: 0.875,
                mosi: 0x42,
                miso: 0x41,
            }
        );
        assert_eq!(events[3], SpiEvent::Disable { end_time: 1.0 });
    }

    #[test]
    fn test_read_capture_file() {
        let path = std::env::temp_dir().join(format!("ps2-capture-{}.jsonl", std::process::id()));
        std::fs::write(&path, CAPTURE).unwrap();
        let events = read_capture(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(events.len(), 4);

        assert!(read_capture("/nonexistent/capture.jsonl").is_err());
    }

    #[test]
    fn test_comments_and_blanks() {
        assert!(parse_event("", 1).unwrap().is_none());
        assert!(parse_event("   # note", 2).unwrap().is_none());
    }

    #[test]
    fn test_wide_word_rejected() {
        let line = r#"{"type":"result","start_time":0,"end_time":1,"mosi":[1,2],"miso":[0]}"#;
        match parse_event(line, 7) {
            Err(DecoderError::InvalidWord { line, len }) => {
                assert_eq!(line, 7);
                assert_eq!(len, 2);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_error_reports_line() {
        let capture = "{\"type\":\"enable\",\"start_time\":0}\nnot json\n";
        let mut reader = CaptureReader::new(Cursor::new(capture));
        assert!(reader.next().unwrap().is_ok());
        match reader.next() {
            Some(Err(DecoderError::Json { line, .. })) => assert_eq!(line, 2),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
