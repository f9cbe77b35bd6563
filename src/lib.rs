//! # rirdb - Regional Internet Registry delegation data loader
//!
//! This library turns the delegation statistics published by the five
//! Regional Internet Registries (AFRINIC, APNIC, ARIN, RIPE NCC and LACNIC)
//! into IPv4 range records tagged with a country, ready for bulk loading into
//! a geolocation table.
//!
//! ## Overview
//!
//! Each registry publishes a pipe-separated delegation file plus an MD5
//! checksum file. A run verifies each downloaded file against its checksum,
//! pre-scans the files to count records, then streams the records in
//! fixed-size batches into a sink (a SQL script or JSON lines).
//!
//! ## Architecture
//!
//! - `country`: ISO 3166 alpha-2 code to country name table
//! - `rir::dialect`: Per-registry format and publication descriptors
//! - `rir::parser`: Line classifier and record streaming state machine
//! - `rir::record`: Record model and CIDR derivation
//! - `rir::checksum`: MD5 checksum file parsing and verification
//! - `rir::package`: Entries and packages, pre-scan counting
//! - `rir::source`: File fetching and package assembly
//! - `loader`: Batch loader and output sinks
//! - `config` / `config_loader`: YAML answers file
//! - `utils`: IPv4 address and prefix arithmetic
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rirdb::country::CountryCodeTable;
//! use rirdb::loader::{BatchLoader, SqlScriptWriter};
//! use rirdb::rir::{acquire_package, dialect, CacheDirFetcher, ErrorPolicy};
//!
//! let countries = Arc::new(CountryCodeTable::bundled()?);
//! let mut fetcher = CacheDirFetcher::new("cache");
//! let mut package = acquire_package(&dialect::APNIC, &mut fetcher)?;
//! package.scan(&countries, ErrorPolicy::Abort)?;
//!
//! let mut sink = SqlScriptWriter::new(std::io::stdout(), "iptable");
//! let loader = BatchLoader::new(400, ErrorPolicy::Abort)?;
//! let report = loader.load(&[package], &countries, &mut sink, |_| {})?;
//! println!("{} records loaded", report.confirmed);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Configuration Format
//!
//! ```yaml
//! cache_dir: "cache"
//! registries: [afrinic, apnic, arin, ripencc, lacnic]
//! ignore_package_errors: false
//! batch_size: 400
//! output:
//!   format: sql          # or json_lines
//!   path: "iptable.sql"
//!   table: "iptable"
//!   drop_existing: true
//!   create_table: true
//! ```
//!
//! ## Error Handling
//!
//! Library modules return typed `thiserror` errors. The binary wraps them with
//! `color_eyre` for reporting with context.

pub mod config;
pub mod config_loader;
pub mod country;
pub mod loader;
pub mod rir;
pub mod utils;
