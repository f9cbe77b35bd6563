//! Regional Internet Registry delegation data.
//!
//! This module turns the statistics files published by the five RIRs into
//! typed [`Record`]s:
//!
//! - `dialect`: per-registry parameters and publication layout
//! - `record`: the typed record and its CIDR arithmetic
//! - `parser`: the shared line parser
//! - `checksum`: MD5 verification of downloaded files
//! - `package`: entries, packages and the pre-scan
//! - `source`: fetching, verifying and packaging a registry's files

pub mod checksum;
pub mod dialect;
pub mod package;
pub mod parser;
pub mod record;
pub mod source;

pub use checksum::{ChecksumError, ChecksumLayout, Verification};
pub use dialect::{Dialect, ALL_DIALECTS};
pub use package::{ContentType, Entry, ErrorDisposition, ErrorPolicy, Package, ScanError};
pub use parser::{LineOutcome, ParseError, ParserState, RecordParser};
pub use record::{Record, RecordStatus};
pub use source::{acquire_package, AcquireError, CacheDirFetcher, FetchError, FileFetcher, RemoteFile};
