//! ISO 3166 alpha-2 country code table.
//!
//! Records only carry the two-letter code published by the registry. The
//! table resolves that code into a display name. It is loaded once at start-up
//! and shared read-only (behind an `Arc`) by every record of the run.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, warn};

/// Country code list shipped with the crate
const BUNDLED_COUNTRY_CODES: &str = include_str!("../resources/iso-alpha2.txt");

/// Errors that can occur while loading a country code resource
#[derive(Debug, thiserror::Error)]
pub enum CountryCodeError {
    #[error("Duplicate country code '{code}' at line {line_number}: {line}")]
    DuplicateCountryCode {
        code: String,
        line: String,
        line_number: u64,
    },

    #[error("Failed to read country code resource")]
    Io(#[from] std::io::Error),
}

/// Case-insensitive mapping from ISO alpha-2 code to country name
#[derive(Debug, Clone, Default)]
pub struct CountryCodeTable {
    names: BTreeMap<String, String>,
}

impl CountryCodeTable {
    /// Load a table from `Name, Code` lines.
    ///
    /// Blank lines and lines starting with `#` or `;` are ignored. Double
    /// quotes protect commas inside the name and are stripped.
    pub fn load<R: BufRead>(reader: R) -> Result<Self, CountryCodeError> {
        let mut names = BTreeMap::new();

        for (index, line_result) in reader.lines().enumerate() {
            let line_number = index as u64 + 1;
            let raw = line_result?;
            let line = raw.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            let Some((name, code)) = split_entry(line) else {
                warn!("Ignoring country code line {} without a code: {}", line_number, line);
                continue;
            };

            let key = normalize_code(code);
            if names.contains_key(&key) {
                return Err(CountryCodeError::DuplicateCountryCode {
                    code: key,
                    line: line.to_string(),
                    line_number,
                });
            }
            names.insert(key, name);
        }

        Ok(Self { names })
    }

    /// Load a table from a file on disk
    pub fn from_path(path: &Path) -> Result<Self, CountryCodeError> {
        let file = File::open(path)?;
        let table = Self::load(BufReader::new(file))?;
        debug!("Loaded {} country codes from {}", table.len(), path.display());
        Ok(table)
    }

    /// Parse a table from in-memory text
    pub fn parse(text: &str) -> Result<Self, CountryCodeError> {
        Self::load(text.as_bytes())
    }

    /// The ISO 3166 list compiled into the binary
    pub fn bundled() -> Result<Self, CountryCodeError> {
        Self::parse(BUNDLED_COUNTRY_CODES)
    }

    /// Country name for `code`, or `None` for blank and unknown codes
    pub fn name(&self, code: &str) -> Option<&str> {
        if code.trim().is_empty() {
            return None;
        }
        self.names.get(&normalize_code(code)).map(String::as_str)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.names.contains_key(&normalize_code(code))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate `(code, name)` pairs in code order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(code, name)| (code.as_str(), name.as_str()))
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Split a line at its first comma outside double quotes.
///
/// Returns the unquoted name and the remaining code text.
fn split_entry(line: &str) -> Option<(String, &str)> {
    let mut name = String::with_capacity(line.len());
    let mut quoted = false;

    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => {
                let code = line[i + 1..].trim();
                if code.is_empty() {
                    return None;
                }
                return Some((name.trim().to_string(), code));
            }
            _ => name.push(c),
        }
    }

    None
}
