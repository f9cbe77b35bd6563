//! SQL script sink.
//!
//! Emits multi-row `INSERT` statements, one per batch, that can be piped into
//! any SQL client. Column order follows the record model.

use std::io::Write;

use chrono::NaiveDate;

use super::{BulkInsert, SinkError};
use crate::rir::record::Record;

/// Columns written for each record, in order
pub const COLUMNS: [&str; 8] = [
    "ipcidr",
    "ipdec",
    "address_count",
    "country_code",
    "country_name",
    "update_date",
    "status",
    "city",
];

/// Writes record batches as SQL statements
pub struct SqlScriptWriter<W: Write> {
    writer: W,
    table: String,
}

impl<W: Write> SqlScriptWriter<W> {
    pub fn new(writer: W, table: impl Into<String>) -> Self {
        Self {
            writer,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Write the optional `DROP TABLE` and `CREATE TABLE` statements
    pub fn write_preamble(&mut self, drop_existing: bool, create_table: bool) -> std::io::Result<()> {
        if drop_existing {
            writeln!(self.writer, "DROP TABLE IF EXISTS {};", self.table)?;
        }
        if create_table {
            writeln!(self.writer, "CREATE TABLE IF NOT EXISTS {} (", self.table)?;
            writeln!(self.writer, "    ipcidr VARCHAR(18) NOT NULL,")?;
            writeln!(self.writer, "    ipdec BIGINT NOT NULL,")?;
            writeln!(self.writer, "    address_count BIGINT NOT NULL,")?;
            writeln!(self.writer, "    country_code CHAR(2),")?;
            writeln!(self.writer, "    country_name VARCHAR(64),")?;
            writeln!(self.writer, "    update_date DATE,")?;
            writeln!(self.writer, "    status VARCHAR(16) NOT NULL,")?;
            writeln!(self.writer, "    city VARCHAR(64)")?;
            writeln!(self.writer, ");")?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> BulkInsert for SqlScriptWriter<W> {
    fn insert(&mut self, batch: &[Record]) -> Result<usize, SinkError> {
        if batch.is_empty() {
            return Ok(0);
        }

        writeln!(self.writer, "INSERT INTO {} ({}) VALUES", self.table, COLUMNS.join(", "))?;
        for (i, record) in batch.iter().enumerate() {
            let terminator = if i + 1 == batch.len() { ";" } else { "," };
            writeln!(self.writer, "    {}{}", row_values(record), terminator)?;
        }
        Ok(batch.len())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

fn row_values(record: &Record) -> String {
    let code = record.country_iso_code().trim();
    let values = [
        quote(&record.address_cidr()),
        record.address_dec().to_string(),
        record.address_count().to_string(),
        optional(Some(code).filter(|code| !code.is_empty())),
        optional(record.country()),
        date(record.assign_date()),
        quote(record.status().as_str()),
        optional(record.city()),
    ];
    format!("({})", values.join(", "))
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn optional(value: Option<&str>) -> String {
    value.map(quote).unwrap_or_else(|| "NULL".to_string())
}

fn date(value: Option<NaiveDate>) -> String {
    value
        .map(|date| quote(&date.format("%Y-%m-%d").to_string()))
        .unwrap_or_else(|| "NULL".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::country::CountryCodeTable;
    use std::sync::Arc;

    fn record(code: &str, address: &str, count: i64, date: Option<NaiveDate>, city: Option<&str>) -> Record {
        let countries = Arc::new(CountryCodeTable::parse("Japan, JP\n\"Cote d'Ivoire\", CI\n").unwrap());
        Record::new(countries, code, address, count, date, "allocated", city).unwrap()
    }

    fn output(writer: SqlScriptWriter<Vec<u8>>) -> String {
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_insert_batch() {
        let mut writer = SqlScriptWriter::new(Vec::new(), "iptable");
        let batch = vec![
            record("JP", "202.0.0.0", 256, NaiveDate::from_ymd_opt(2003, 1, 1), None),
            record("CI", "41.0.0.0", 1024, None, Some("Abidjan")),
        ];

        assert_eq!(writer.insert(&batch).unwrap(), 2);
        let sql = output(writer);
        let expected = "INSERT INTO iptable (ipcidr, ipdec, address_count, country_code, country_name, update_date, status, city) VALUES\n    ('202.0.0.0/24', 3388997632, 256, 'JP', 'Japan', '2003-01-01', 'ALLOCATED', NULL),\n    ('41.0.0.0/22', 687865856, 1024, 'CI', 'Cote d''Ivoire', NULL, 'ALLOCATED', 'Abidjan');\n";
        assert_eq!(sql, expected);
    }

    #[test]
    fn test_unknown_country_is_null() {
        let mut writer = SqlScriptWriter::new(Vec::new(), "iptable");
        writer.insert(&[record("ZZ", "10.0.0.0", 256, None, None)]).unwrap();
        assert!(output(writer).contains("'ZZ', NULL, NULL"));
    }

    #[test]
    fn test_empty_batch_writes_nothing() {
        let mut writer = SqlScriptWriter::new(Vec::new(), "iptable");
        assert_eq!(writer.insert(&[]).unwrap(), 0);
        assert!(output(writer).is_empty());
    }

    #[test]
    fn test_preamble() {
        let mut writer = SqlScriptWriter::new(Vec::new(), "ranges");
        writer.write_preamble(true, true).unwrap();
        let sql = output(writer);
        assert!(sql.starts_with("DROP TABLE IF EXISTS ranges;\nCREATE TABLE IF NOT EXISTS ranges ("));
        assert!(sql.trim_end().ends_with(");"));

        let mut writer = SqlScriptWriter::new(Vec::new(), "ranges");
        writer.write_preamble(false, false).unwrap();
        assert!(output(writer).is_empty());
    }
}
