use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use polywalk_engine::{LocationSink, LocationSinkError, LocationUpdate};

/// Appends one JSON object per ground change to a file.
pub(crate) struct JsonLinesLocationSink {
    writer: BufWriter<File>,
}

impl JsonLinesLocationSink {
    pub(crate) fn open(path: &Path) -> Result<Self, LocationSinkError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl LocationSink for JsonLinesLocationSink {
    fn deliver(&mut self, update: &LocationUpdate) -> Result<(), LocationSinkError> {
        serde_json::to_writer(&mut self.writer, update)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
