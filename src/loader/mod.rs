//! Batch loading of parsed records into a bulk-insert sink.
//!
//! The loader re-opens every scanned entry, streams its records and hands
//! them to a [`BulkInsert`] sink in fixed-size batches. Progress is measured
//! against the totals found by the pre-scan.

pub mod json_lines;
pub mod sql_script;

use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::country::CountryCodeTable;
use crate::rir::package::{ErrorPolicy, Package, ScanError};
use crate::rir::parser::ParseError;
use crate::rir::record::Record;

pub use json_lines::JsonLinesWriter;
pub use sql_script::SqlScriptWriter;

/// Error type returned by sinks
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Destination of record batches
pub trait BulkInsert {
    /// Store `batch` and return how many records were confirmed
    fn insert(&mut self, batch: &[Record]) -> Result<usize, SinkError>;

    /// Flush anything still buffered once loading ends
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Loading progress after a batch flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: u64,
    /// Pre-scan total; an undercount when some entries were never scanned
    pub total: u64,
}

/// Summary of a finished load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub processed: u64,
    pub confirmed: u64,
    pub batches: u64,
    pub skipped_errors: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Batch size must be greater than zero")]
    InvalidBatchSize,

    #[error(transparent)]
    Open(#[from] ScanError),

    #[error("Error while processing record #{processed} from package {registry}.{entry}")]
    Aborted {
        registry: String,
        entry: String,
        /// Records already handed to the sink; those stay committed
        processed: u64,
        #[source]
        source: ParseError,
    },

    #[error("Bulk insert failed after {processed} records")]
    Sink {
        processed: u64,
        #[source]
        source: SinkError,
    },
}

/// Streams records from packages into a sink in fixed-size batches
#[derive(Debug, Clone)]
pub struct BatchLoader {
    batch_size: usize,
    policy: ErrorPolicy,
}

impl BatchLoader {
    pub fn new(batch_size: usize, policy: ErrorPolicy) -> Result<Self, LoadError> {
        if batch_size == 0 {
            return Err(LoadError::InvalidBatchSize);
        }
        Ok(Self { batch_size, policy })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Load every entry of every package, in order.
    ///
    /// With [`ErrorPolicy::Abort`] the first parse error stops the load.
    /// Batches flushed before that point stay in the sink; records still
    /// buffered are dropped.
    pub fn load<S, P>(
        &self,
        packages: &[Package],
        countries: &Arc<CountryCodeTable>,
        sink: &mut S,
        mut on_progress: P,
    ) -> Result<LoadReport, LoadError>
    where
        S: BulkInsert + ?Sized,
        P: FnMut(Progress),
    {
        let total: u64 = packages.iter().map(Package::total_record_count).sum();
        if packages.iter().any(|package| !package.is_fully_scanned()) {
            warn!("Not every package was pre-scanned; progress totals are an undercount");
        }

        let mut report = LoadReport::default();
        let mut buffer: Vec<Record> = Vec::with_capacity(self.batch_size);

        for package in packages {
            for entry in package.entries() {
                debug!("Loading entry {} of RIR package {}", entry.identifier(), package.registry());
                let mut parser = entry.open(Arc::clone(countries))?;

                loop {
                    let next = match parser.next_record() {
                        Ok(next) => next,
                        Err(err) => match self.policy {
                            ErrorPolicy::Warn => {
                                warn!(
                                    "Error while processing record #{} from package {}.{}: {}",
                                    report.processed,
                                    package.registry(),
                                    entry.identifier(),
                                    err
                                );
                                report.skipped_errors += 1;
                                continue;
                            }
                            ErrorPolicy::Abort => {
                                error!(
                                    "Error while processing record #{} from package {}.{}: {}",
                                    report.processed,
                                    package.registry(),
                                    entry.identifier(),
                                    err
                                );
                                return Err(LoadError::Aborted {
                                    registry: package.registry().to_string(),
                                    entry: entry.identifier().to_string(),
                                    processed: report.processed,
                                    source: err,
                                });
                            }
                        },
                    };

                    let exhausted = next.is_none();
                    if let Some(record) = next {
                        buffer.push(record);
                    }

                    if buffer.len() >= self.batch_size || (exhausted && !buffer.is_empty()) {
                        flush(&mut buffer, sink, &mut report)?;
                        on_progress(Progress {
                            processed: report.processed,
                            total,
                        });
                    }

                    if exhausted {
                        break;
                    }
                }
            }
        }

        sink.finish().map_err(|source| LoadError::Sink {
            processed: report.processed,
            source,
        })?;

        info!(
            "{} out of {} records confirmed in {} batches",
            report.confirmed, report.processed, report.batches
        );
        if report.confirmed != report.processed {
            warn!(
                "Confirmed record count ({}) and processed record count ({}) do not match. Output may be corrupt",
                report.confirmed, report.processed
            );
        }

        Ok(report)
    }
}

fn flush<S>(buffer: &mut Vec<Record>, sink: &mut S, report: &mut LoadReport) -> Result<(), LoadError>
where
    S: BulkInsert + ?Sized,
{
    let confirmed = sink.insert(buffer).map_err(|source| LoadError::Sink {
        processed: report.processed,
        source,
    })?;

    if confirmed != buffer.len() {
        warn!(
            "Sink confirmed {} of {} records in batch {}",
            confirmed,
            buffer.len(),
            report.batches + 1
        );
    }

    report.processed += buffer.len() as u64;
    report.confirmed += confirmed as u64;
    report.batches += 1;
    buffer.clear();
    Ok(())
}
