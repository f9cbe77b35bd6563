//! Packages of delegation files.
//!
//! A [`Package`] holds every file ("entry") fetched for one registry in one
//! run. Before loading, each entry is scanned once: fully parsed and counted,
//! without keeping the records, so that corrupt files surface early and the
//! loader knows the total record count.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use super::dialect::Dialect;
use super::parser::{ParseError, RecordParser};
use crate::country::CountryCodeTable;

bitflags! {
    /// Kind of delegation data an entry holds
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ContentType: u8 {
        const DELEGATED = 1;
        const ASSIGNED = 2;
        const AVAILABLE = 4;
        const RESERVED = 8;
        const COMBINED = 15;
    }
}

impl ContentType {
    pub const ALLOCATED: Self = Self::DELEGATED;

    /// Upper-case label used in entry identifiers, e.g. `COMBINED`
    pub fn label(&self) -> String {
        if *self == Self::COMBINED {
            return "COMBINED".to_string();
        }
        if self.is_empty() {
            return "UNKNOWN".to_string();
        }
        self.iter_names().map(|(name, _)| name).collect::<Vec<_>>().join("_")
    }
}

/// How parse errors are treated during scanning and loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// The first parse error aborts the operation
    #[default]
    Abort,
    /// Parse errors are logged and the offending line is skipped
    Warn,
}

impl ErrorPolicy {
    pub fn from_errors_as_warnings(errors_as_warnings: bool) -> Self {
        if errors_as_warnings {
            ErrorPolicy::Warn
        } else {
            ErrorPolicy::Abort
        }
    }
}

/// Answer of a scan error callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Skip the line and keep scanning
    Handled,
    /// Stop and propagate the error
    Unhandled,
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Failed to open entry {identifier} at {}", path.display())]
    Open {
        identifier: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to scan entry {identifier}")]
    Parse {
        identifier: String,
        #[source]
        source: ParseError,
    },
}

/// One parseable local delegation file
#[derive(Debug, Clone)]
pub struct Entry {
    path: PathBuf,
    identifier: String,
    content_type: ContentType,
    dialect: &'static Dialect,
    record_count: Option<u64>,
}

impl Entry {
    pub fn new(path: impl Into<PathBuf>, identifier: impl Into<String>, content_type: ContentType, dialect: &'static Dialect) -> Self {
        Self {
            path: path.into(),
            identifier: identifier.into(),
            content_type,
            dialect,
            record_count: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn dialect(&self) -> &'static Dialect {
        self.dialect
    }

    pub fn is_scanned(&self) -> bool {
        self.record_count.is_some()
    }

    /// Records counted by the last successful scan
    pub fn record_count(&self) -> Option<u64> {
        self.record_count
    }

    /// Open a fresh parser positioned at the start of the file
    pub fn open(&self, countries: Arc<CountryCodeTable>) -> Result<RecordParser<BufReader<File>>, ScanError> {
        let file = File::open(&self.path).map_err(|source| ScanError::Open {
            identifier: self.identifier.clone(),
            path: self.path.clone(),
            source,
        })?;
        Ok(RecordParser::new(BufReader::with_capacity(64 * 1024, file), self.dialect, countries))
    }

    /// Count the records of this entry.
    ///
    /// `on_error` decides whether a parse error is skipped or propagated. An
    /// entry that fails stays unscanned. Scanning twice is a no-op.
    pub fn scan<F>(&mut self, countries: &Arc<CountryCodeTable>, mut on_error: F) -> Result<u64, ScanError>
    where
        F: FnMut(&ParseError) -> ErrorDisposition,
    {
        if let Some(count) = self.record_count {
            return Ok(count);
        }

        let mut parser = self.open(Arc::clone(countries))?;
        let mut count = 0u64;

        loop {
            match parser.next_record() {
                Ok(Some(_)) => count += 1,
                Ok(None) => break,
                Err(err) => {
                    if on_error(&err) == ErrorDisposition::Unhandled {
                        return Err(ScanError::Parse {
                            identifier: self.identifier.clone(),
                            source: err,
                        });
                    }
                }
            }
        }

        self.record_count = Some(count);
        Ok(count)
    }
}

/// Every entry fetched for one registry in one run
#[derive(Debug, Clone)]
pub struct Package {
    registry: String,
    timestamp: DateTime<Utc>,
    entries: Vec<Entry>,
}

impl Package {
    pub fn new(registry: impl Into<String>, timestamp: DateTime<Utc>, entries: Vec<Entry>) -> Self {
        Self {
            registry: registry.into(),
            timestamp,
            entries,
        }
    }

    pub fn registry(&self) -> &str {
        &self.registry
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Sum of the record counts of scanned entries only
    pub fn total_record_count(&self) -> u64 {
        self.entries.iter().filter_map(Entry::record_count).sum()
    }

    pub fn is_fully_scanned(&self) -> bool {
        self.entries.iter().all(Entry::is_scanned)
    }

    /// Scan every entry that has not been scanned yet, in order
    pub fn scan(&mut self, countries: &Arc<CountryCodeTable>, policy: ErrorPolicy) -> Result<(), ScanError> {
        info!(
            "Pre-scanning package for RIR {} with {} entries",
            self.registry,
            self.entries.len()
        );

        for entry in &mut self.entries {
            if let Some(count) = entry.record_count() {
                debug!(
                    "Entry {} for RIR package {} is already scanned ({} records), skipping",
                    entry.identifier(),
                    self.registry,
                    count
                );
                continue;
            }

            debug!("Pre-scanning entry {} for RIR package {}", entry.identifier(), self.registry);
            let count = entry.scan(countries, |err| match policy {
                ErrorPolicy::Warn => {
                    warn!("Error while processing line {}: {}. Ignoring", err.line_number(), err);
                    ErrorDisposition::Handled
                }
                ErrorPolicy::Abort => {
                    error!("Error while processing line {}: {}. Aborting", err.line_number(), err);
                    ErrorDisposition::Unhandled
                }
            })?;
            debug!(
                "Pre-scanning found {} records for entry {} in RIR package {}",
                count,
                entry.identifier(),
                self.registry
            );
        }

        info!(
            "Pre-scanning completed for RIR package {}: {} total records",
            self.registry,
            self.total_record_count()
        );
        Ok(())
    }
}
