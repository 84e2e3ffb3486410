//! File log sink: buffered CSV artifacts on removable storage.
//!
//! ```text
//! sensything_1.csv
//!   timestamp,count,ch0_pf,ch0_pf_capdac,...,status_flags
//!   1234,17,1.2500,3,...,2
//! ```
//!
//! Lines accumulate in RAM and go to the medium once `flush_threshold_lines`
//! are pending, or on an explicit flush, rotate or disable.  Each artifact
//! gets its own header.  A failed write closes the artifact; the next
//! delivery opens a fresh one if the medium is still there.

use core::fmt::Write as _;

use log::{debug, info, warn};

use crate::app::model::{ArtifactInfo, BoardLayout, MAX_NAME_LEN, MeasurementRecord, SinkKind};
use crate::app::ports::SinkAdapter;
use crate::config::FileLogConfig;
use crate::error::{DeliveryError, IoError, SinkInitError};

use super::utils::{has_capdac_columns, push_reading};

pub type ArtifactName = heapless::String<MAX_NAME_LEN>;

/// An appendable store of named text artifacts (a mounted directory).
pub trait ArtifactStore {
    /// The medium is present and mounted.
    fn is_available(&self) -> bool;

    /// Append `data` to `name`, creating it if needed.
    fn append(&mut self, name: &str, data: &[u8]) -> Result<(), IoError>;
}

pub fn format_header(layout: &BoardLayout) -> String {
    let capdac = has_capdac_columns(layout);
    let mut s = String::from("timestamp,count");
    for ch in layout.channels() {
        s.push(',');
        s.push_str(&ch.label);
        if capdac {
            s.push(',');
            s.push_str(&ch.label);
            s.push_str("_capdac");
        }
    }
    s.push_str(",status_flags");
    s
}

pub fn format_line(record: &MeasurementRecord, layout: &BoardLayout) -> String {
    let capdac = has_capdac_columns(layout);
    let mut s = String::new();
    let _ = write!(s, "{},{}", record.timestamp_ms, record.sequence);
    for i in 0..layout.channel_count() {
        s.push(',');
        push_reading(&mut s, layout.reading(record, i), 4);
        if capdac {
            let _ = write!(s, ",{}", record.metadata.get(i).copied().unwrap_or(0));
        }
    }
    let _ = write!(s, ",{:x}", record.status);
    s
}

pub struct FileLogSink<S: ArtifactStore> {
    store: S,
    config: FileLogConfig,
    buffer: String,
    buffered_lines: usize,
    current: Option<ArtifactName>,
    artifact_count: u32,
}

impl<S: ArtifactStore> FileLogSink<S> {
    /// Fails when no medium is mounted.
    pub fn open(store: S, config: &FileLogConfig) -> Result<Self, SinkInitError> {
        if !store.is_available() {
            return Err(SinkInitError::new(SinkKind::FileLog, "storage medium not available"));
        }
        info!("FileLog: medium ready at {}", config.mount_point);
        Ok(Self {
            store,
            config: config.clone(),
            buffer: String::new(),
            buffered_lines: 0,
            current: None,
            artifact_count: 0,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn buffered_lines(&self) -> usize {
        self.buffered_lines
    }

    fn open_artifact(&mut self, layout: &BoardLayout) -> Result<(), IoError> {
        let mut name = ArtifactName::new();
        write!(
            name,
            "{}{}{}",
            self.config.prefix,
            self.artifact_count + 1,
            self.config.extension
        )
        .map_err(|_| IoError::OpenFailed)?;

        let mut header = format_header(layout);
        header.push('\n');
        self.store.append(&name, header.as_bytes()).map_err(|e| {
            warn!("FileLog: cannot create {}: {}", name, e);
            IoError::OpenFailed
        })?;

        self.artifact_count += 1;
        info!("FileLog: opened {}", name);
        self.current = Some(name);
        Ok(())
    }

    fn write_buffer(&mut self) -> Result<(), IoError> {
        if self.buffered_lines == 0 {
            return Ok(());
        }
        let Some(name) = self.current.as_ref() else {
            self.discard_buffer();
            return Ok(());
        };
        let result = self.store.append(name, self.buffer.as_bytes());
        match result {
            Ok(()) => {
                debug!("FileLog: wrote {} lines to {}", self.buffered_lines, name);
                self.discard_buffer();
                Ok(())
            }
            Err(e) => {
                warn!("FileLog: write to {} failed: {}; closing artifact", name, e);
                self.discard_buffer();
                self.current = None;
                Err(IoError::WriteFailed)
            }
        }
    }

    fn discard_buffer(&mut self) {
        self.buffer.clear();
        self.buffered_lines = 0;
    }
}

impl<S: ArtifactStore> SinkAdapter for FileLogSink<S> {
    fn kind(&self) -> SinkKind {
        SinkKind::FileLog
    }

    fn deliver(
        &mut self,
        record: &MeasurementRecord,
        layout: &BoardLayout,
    ) -> Result<(), DeliveryError> {
        if !self.store.is_available() {
            return Err(IoError::NotMounted.into());
        }
        if self.current.is_none() {
            self.open_artifact(layout)?;
        }
        self.buffer.push_str(&format_line(record, layout));
        self.buffer.push('\n');
        self.buffered_lines += 1;
        if self.buffered_lines >= self.config.flush_threshold_lines {
            self.write_buffer()?;
        }
        Ok(())
    }

    fn is_live(&self) -> bool {
        self.store.is_available()
    }

    fn flush(&mut self) -> Result<(), IoError> {
        self.write_buffer()
    }

    fn rotate(&mut self) -> Result<(), IoError> {
        if !self.store.is_available() {
            return Err(IoError::NotMounted);
        }
        let flushed = self.write_buffer();
        if let Some(name) = self.current.take() {
            info!("FileLog: closed {}", name);
        }
        flushed
    }

    fn artifact(&self) -> Option<ArtifactInfo> {
        Some(ArtifactInfo {
            current: self.current.clone(),
            count: self.artifact_count,
        })
    }
}

impl<S: ArtifactStore> Drop for FileLogSink<S> {
    fn drop(&mut self) {
        if self.buffered_lines > 0 {
            let _ = self.write_buffer();
        }
    }
}

/// [`ArtifactStore`] over a directory of the filesystem.  On the device
/// this is the FAT volume mounted by the SD/MMC bring-up.
pub struct DirectoryStore {
    root: std::path::PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ArtifactStore for DirectoryStore {
    fn is_available(&self) -> bool {
        self.root.is_dir()
    }

    fn append(&mut self, name: &str, data: &[u8]) -> Result<(), IoError> {
        use std::io::Write as _;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.root.join(name))
            .map_err(|_| IoError::OpenFailed)?;
        file.write_all(data).map_err(|_| IoError::WriteFailed)
    }
}
