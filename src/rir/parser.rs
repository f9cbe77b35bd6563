//! Delegation file parser.
//!
//! A delegation file is `|`-delimited text: one header line
//! `<version>|<registry>|...`, followed by summary, asn, ipv6 and ipv4 lines.
//! Only ipv4 lines produce records. One parser serves every registry; the
//! [`Dialect`] supplies the identifier, header token and date quirk.

use std::io::{self, BufRead};
use std::sync::Arc;

use chrono::NaiveDate;
use log::warn;

use super::dialect::Dialect;
use super::record::Record;
use crate::country::CountryCodeTable;
use crate::utils::ip_utils::AddressError;

/// Dates below this value are placeholders (e.g. `00000000`) and mean "no date"
const MIN_ASSIGN_DATE: i64 = 19500101;

/// Errors raised while parsing a delegation file.
///
/// Every variant except `Io` carries the raw line and its 1-based number.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("No valid header found at line {line_number}: {line}")]
    HeaderInvalid { line: String, line_number: u64 },

    #[error("Not a valid record at line {line_number} ({fields} fields): {line}")]
    RecordInvalid {
        fields: usize,
        line: String,
        line_number: u64,
    },

    #[error("Unexpected record registry '{found}' (expected '{expected}') at line {line_number}")]
    OrganizationMismatch {
        expected: &'static str,
        found: String,
        line: String,
        line_number: u64,
    },

    #[error("Unknown record type '{record_type}' at line {line_number}")]
    UnknownRecordType {
        record_type: String,
        line: String,
        line_number: u64,
    },

    #[error("Invalid address at line {line_number}: {source}")]
    InvalidAddress {
        line: String,
        line_number: u64,
        #[source]
        source: AddressError,
    },

    #[error("Invalid {field} '{value}' at line {line_number}")]
    InvalidField {
        field: &'static str,
        value: String,
        line: String,
        line_number: u64,
    },

    #[error("Failed to read line {line_number}")]
    Io {
        line_number: u64,
        #[source]
        source: io::Error,
    },
}

impl ParseError {
    /// The offending raw line, when one was read
    pub fn line(&self) -> Option<&str> {
        match self {
            ParseError::HeaderInvalid { line, .. }
            | ParseError::RecordInvalid { line, .. }
            | ParseError::OrganizationMismatch { line, .. }
            | ParseError::UnknownRecordType { line, .. }
            | ParseError::InvalidAddress { line, .. }
            | ParseError::InvalidField { line, .. } => Some(line),
            ParseError::Io { .. } => None,
        }
    }

    pub fn line_number(&self) -> u64 {
        match self {
            ParseError::HeaderInvalid { line_number, .. }
            | ParseError::RecordInvalid { line_number, .. }
            | ParseError::OrganizationMismatch { line_number, .. }
            | ParseError::UnknownRecordType { line_number, .. }
            | ParseError::InvalidAddress { line_number, .. }
            | ParseError::InvalidField { line_number, .. }
            | ParseError::Io { line_number, .. } => *line_number,
        }
    }
}

/// Result of feeding one line to the parser
#[derive(Debug)]
pub enum LineOutcome {
    Record(Record),
    /// Comment, header, summary, asn or ipv6 line
    Skip,
    Error(ParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    AwaitHeader,
    Streaming,
    Done,
}

/// Streaming record reader over one delegation file
pub struct RecordParser<R> {
    reader: R,
    dialect: &'static Dialect,
    countries: Arc<CountryCodeTable>,
    state: ParserState,
    line_number: u64,
    header_line: Option<u64>,
    buffer: Vec<u8>,
}

impl<R: BufRead> RecordParser<R> {
    pub fn new(reader: R, dialect: &'static Dialect, countries: Arc<CountryCodeTable>) -> Self {
        Self {
            reader,
            dialect,
            countries,
            state: ParserState::AwaitHeader,
            line_number: 0,
            header_line: None,
            buffer: Vec::with_capacity(256),
        }
    }

    pub fn dialect(&self) -> &'static Dialect {
        self.dialect
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Number of the last line read (1-based, 0 before the first read)
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    pub fn header_line_number(&self) -> Option<u64> {
        self.header_line
    }

    /// Read forward until the next record.
    ///
    /// Returns `Ok(None)` at end of input. After an error the parser is
    /// positioned past the offending line, so calling again resumes with the
    /// following line. Read failures end the stream.
    pub fn next_record(&mut self) -> Result<Option<Record>, ParseError> {
        loop {
            if self.state == ParserState::Done {
                return Ok(None);
            }

            self.buffer.clear();
            match self.reader.read_until(b'\n', &mut self.buffer) {
                Ok(0) => {
                    if self.state == ParserState::AwaitHeader {
                        warn!(
                            "Reached end of {} file after {} lines without a header",
                            self.dialect.display_name, self.line_number
                        );
                    }
                    self.state = ParserState::Done;
                    return Ok(None);
                }
                Ok(_) => self.line_number += 1,
                Err(source) => {
                    self.state = ParserState::Done;
                    return Err(ParseError::Io {
                        line_number: self.line_number + 1,
                        source,
                    });
                }
            }

            let buffer = std::mem::take(&mut self.buffer);
            let outcome = self.parse_line(&String::from_utf8_lossy(&buffer), self.line_number);
            self.buffer = buffer;

            match outcome {
                LineOutcome::Record(record) => return Ok(Some(record)),
                LineOutcome::Skip => continue,
                LineOutcome::Error(err) => return Err(err),
            }
        }
    }

    /// Classify a single line, advancing past the header when it matches
    pub fn parse_line(&mut self, raw: &str, line_number: u64) -> LineOutcome {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            return LineOutcome::Skip;
        }

        let fields: Vec<&str> = line.split('|').map(str::trim).collect();

        if self.state == ParserState::AwaitHeader {
            if !self.is_header(&fields) {
                return LineOutcome::Error(ParseError::HeaderInvalid {
                    line: line.to_string(),
                    line_number,
                });
            }
            self.state = ParserState::Streaming;
            self.header_line = Some(line_number);
            return LineOutcome::Skip;
        }

        match self.parse_data_line(&fields, line, line_number) {
            Ok(Some(record)) => LineOutcome::Record(record),
            Ok(None) => LineOutcome::Skip,
            Err(err) => LineOutcome::Error(err),
        }
    }

    fn is_header(&self, fields: &[&str]) -> bool {
        fields.len() >= 2
            && fields[0] == self.dialect.header_version
            && fields[1].eq_ignore_ascii_case(self.dialect.identifier)
    }

    fn parse_data_line(&self, fields: &[&str], line: &str, line_number: u64) -> Result<Option<Record>, ParseError> {
        let record_invalid = || ParseError::RecordInvalid {
            fields: fields.len(),
            line: line.to_string(),
            line_number,
        };

        if fields.len() < 6 {
            return Err(record_invalid());
        }

        if !fields[0].eq_ignore_ascii_case(self.dialect.identifier) {
            return Err(ParseError::OrganizationMismatch {
                expected: self.dialect.identifier,
                found: fields[0].to_string(),
                line: line.to_string(),
                line_number,
            });
        }

        if fields[5].eq_ignore_ascii_case("summary") {
            return Ok(None);
        }

        if fields.len() < 7 {
            return Err(record_invalid());
        }

        let record_type = fields[2];
        if record_type.eq_ignore_ascii_case("asn") || record_type.eq_ignore_ascii_case("ipv6") {
            return Ok(None);
        }

        if !record_type.eq_ignore_ascii_case("ipv4") {
            return Err(ParseError::UnknownRecordType {
                record_type: record_type.to_string(),
                line: line.to_string(),
                line_number,
            });
        }

        let invalid_field = |field: &'static str, value: &str| ParseError::InvalidField {
            field,
            value: value.to_string(),
            line: line.to_string(),
            line_number,
        };

        let address_count = fields[4]
            .parse::<i64>()
            .map_err(|_| invalid_field("address count", fields[4]))?;
        let assign_date = self
            .parse_assign_date(fields[5])
            .ok_or_else(|| invalid_field("date", fields[5]))?;

        Record::new(
            Arc::clone(&self.countries),
            fields[1],
            fields[3],
            address_count,
            assign_date,
            fields[6],
            None,
        )
        .map(Some)
        .map_err(|source| ParseError::InvalidAddress {
            line: line.to_string(),
            line_number,
            source,
        })
    }

    /// `Some(None)` is a valid "no date" value; `None` is a malformed field
    fn parse_assign_date(&self, value: &str) -> Option<Option<NaiveDate>> {
        if value.is_empty() && self.dialect.allow_blank_date {
            return Some(None);
        }

        let numeric = value.parse::<i64>().ok()?;
        if numeric < MIN_ASSIGN_DATE {
            return Some(None);
        }
        if value.len() != 8 {
            return None;
        }

        let year = (numeric / 10_000) as i32;
        let month = (numeric / 100 % 100) as u32;
        let day = (numeric % 100) as u32;
        NaiveDate::from_ymd_opt(year, month, day).map(Some)
    }
}

impl<R: BufRead> Iterator for RecordParser<R> {
    type Item = Result<Record, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
