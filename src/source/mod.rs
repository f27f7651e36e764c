//! Data Source Module
//! Pluggable producers of raw CSV bytes: local files, in-memory buffers and a live HTTP feed.

mod http;

pub use http::{with_retry, HttpSource, RetryPolicy};

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("Gave up after {attempts} attempt(s): {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

/// Something that can hand the loader a CSV document.
pub trait RegistrationSource {
    /// Human readable identifier used in logs and errors.
    fn name(&self) -> String;

    fn fetch(&self) -> Result<Vec<u8>, SourceError>;

    /// Live sources report schema problems as unavailability rather than bad input.
    fn is_live(&self) -> bool {
        false
    }
}

/// CSV file on local disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistrationSource for FileSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<Vec<u8>, SourceError> {
        Ok(std::fs::read(&self.path)?)
    }
}

/// CSV bytes already held in memory (generated sample data, tests).
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    bytes: Vec<u8>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

impl RegistrationSource for MemorySource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn fetch(&self) -> Result<Vec<u8>, SourceError> {
        Ok(self.bytes.clone())
    }
}
