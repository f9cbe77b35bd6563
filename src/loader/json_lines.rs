//! JSON-lines sink: one serialized record per line.

use std::io::Write;

use chrono::NaiveDate;
use serde::Serialize;

use super::{BulkInsert, SinkError};
use crate::rir::record::Record;

/// Serialized form of a record
#[derive(Debug, Serialize, PartialEq)]
pub struct RecordRow<'a> {
    pub ipcidr: String,
    pub ipdec: u32,
    pub address_count: i64,
    pub country_code: &'a str,
    pub country_name: Option<&'a str>,
    pub update_date: Option<NaiveDate>,
    pub status: &'static str,
    pub city: Option<&'a str>,
}

impl<'a> From<&'a Record> for RecordRow<'a> {
    fn from(record: &'a Record) -> Self {
        Self {
            ipcidr: record.address_cidr(),
            ipdec: record.address_dec(),
            address_count: record.address_count(),
            country_code: record.country_iso_code(),
            country_name: record.country(),
            update_date: record.assign_date(),
            status: record.status().as_str(),
            city: record.city(),
        }
    }
}

pub struct JsonLinesWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> BulkInsert for JsonLinesWriter<W> {
    fn insert(&mut self, batch: &[Record]) -> Result<usize, SinkError> {
        for record in batch {
            serde_json::to_writer(&mut self.writer, &RecordRow::from(record))?;
            self.writer.write_all(b"\n")?;
        }
        Ok(batch.len())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::country::CountryCodeTable;
    use serde_json::{json, Value};
    use std::sync::Arc;

    #[test]
    fn test_one_line_per_record() {
        let countries = Arc::new(CountryCodeTable::parse("Japan, JP\n").unwrap());
        let batch = vec![
            Record::new(
                Arc::clone(&countries),
                "JP",
                "202.0.0.0",
                256,
                NaiveDate::from_ymd_opt(2003, 1, 1),
                "assigned",
                None,
            )
            .unwrap(),
            Record::new(countries, "", "10.1.0.0/16", 1, None, "reserved", Some("Tokyo")).unwrap(),
        ];

        let mut writer = JsonLinesWriter::new(Vec::new());
        assert_eq!(writer.insert(&batch).unwrap(), 2);
        let text = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<Value> = text.lines().map(|line| serde_json::from_str(line).unwrap()).collect();

        assert_eq!(
            lines[0],
            json!({
                "ipcidr": "202.0.0.0/24",
                "ipdec": 3388997632u32,
                "address_count": 256,
                "country_code": "JP",
                "country_name": "Japan",
                "update_date": "2003-01-01",
                "status": "ASSIGNED",
                "city": null
            })
        );
        assert_eq!(lines[1]["ipcidr"], "10.1.0.0/16");
        assert_eq!(lines[1]["country_name"], Value::Null);
        assert_eq!(lines[1]["update_date"], Value::Null);
        assert_eq!(lines[1]["city"], "Tokyo");
    }
}
