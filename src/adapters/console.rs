//! Console sink: CSV lines on a byte stream (USB-CDC / UART on the
//! device, any `Write` in tests).
//!
//! ```text
//! timestamp,ch0_pf,ch1_pf,...,capdac_0,...,status_flags,count
//! 1234,1.2500,NaN,...,3,...,0x2,17
//! ```
//!
//! The header is written once, before the first record.

use std::io::Write;

use crate::app::model::{BoardLayout, MeasurementRecord, SinkKind};
use crate::app::ports::SinkAdapter;
use crate::error::{DeliveryError, IoError};

use super::utils::{has_capdac_columns, push_reading};

pub fn format_header(layout: &BoardLayout) -> String {
    let mut s = String::from("timestamp");
    for ch in layout.channels() {
        s.push(',');
        s.push_str(&ch.label);
    }
    if has_capdac_columns(layout) {
        for i in 0..layout.channel_count() {
            s.push_str(&format!(",capdac_{i}"));
        }
    }
    s.push_str(",status_flags,count");
    s
}

pub fn format_line(record: &MeasurementRecord, layout: &BoardLayout) -> String {
    let mut s = record.timestamp_ms.to_string();
    for i in 0..layout.channel_count() {
        s.push(',');
        push_reading(&mut s, layout.reading(record, i), 4);
    }
    if has_capdac_columns(layout) {
        for i in 0..layout.channel_count() {
            let capdac = record.metadata.get(i).copied().unwrap_or(0);
            s.push_str(&format!(",{capdac}"));
        }
    }
    s.push_str(&format!(",0x{:x},{}", record.status, record.sequence));
    s
}

pub struct ConsoleSink<W: Write> {
    out: W,
    header_written: bool,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            header_written: false,
        }
    }

    fn write_line(&mut self, line: &str) -> Result<(), IoError> {
        writeln!(self.out, "{line}").map_err(|_| IoError::WriteFailed)
    }
}

impl<W: Write> SinkAdapter for ConsoleSink<W> {
    fn kind(&self) -> SinkKind {
        SinkKind::Console
    }

    fn deliver(
        &mut self,
        record: &MeasurementRecord,
        layout: &BoardLayout,
    ) -> Result<(), DeliveryError> {
        if !self.header_written {
            self.write_line(&format_header(layout))?;
            self.header_written = true;
        }
        self.write_line(&format_line(record, layout))?;
        Ok(())
    }

    fn is_live(&self) -> bool {
        true
    }

    fn flush(&mut self) -> Result<(), IoError> {
        self.out.flush().map_err(|_| IoError::WriteFailed)
    }
}
