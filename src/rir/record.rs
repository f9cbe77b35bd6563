//! Typed delegation records.

use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::country::CountryCodeTable;
use crate::utils::ip_utils::{self, AddressError};

/// Allocation status of an address block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordStatus {
    #[default]
    Unknown,
    Assigned,
    Allocated,
    Reserved,
}

impl RecordStatus {
    /// Map a registry status string; anything unrecognised is `Unknown`
    pub fn from_status_str(status: &str) -> Self {
        let status = status.trim();
        if status.eq_ignore_ascii_case("assigned") {
            RecordStatus::Assigned
        } else if status.eq_ignore_ascii_case("allocated") {
            RecordStatus::Allocated
        } else if status.eq_ignore_ascii_case("reserved") {
            RecordStatus::Reserved
        } else {
            RecordStatus::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Unknown => "UNKNOWN",
            RecordStatus::Assigned => "ASSIGNED",
            RecordStatus::Allocated => "ALLOCATED",
            RecordStatus::Reserved => "RESERVED",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One IPv4 block from a delegation file.
///
/// The prefix length, numeric address and alignment flag are derived once at
/// construction. Records whose start address is not aligned to the prefix are
/// still valid records; `is_network_valid` only reports it.
#[derive(Clone)]
pub struct Record {
    country_iso_code: String,
    start_address: String,
    address_count: i64,
    assign_date: Option<NaiveDate>,
    status_string: String,
    city: Option<String>,
    countries: Arc<CountryCodeTable>,
    status: RecordStatus,
    mask_length: u8,
    address_dec: u32,
    is_network_valid: bool,
}

impl Record {
    /// Build a record from already-split field values.
    ///
    /// `start_address` may carry an explicit prefix (`10.0.0.0/8`), which
    /// takes precedence over the prefix derived from `address_count`.
    pub fn new(
        countries: Arc<CountryCodeTable>,
        country_iso_code: &str,
        start_address: &str,
        address_count: i64,
        assign_date: Option<NaiveDate>,
        status_string: &str,
        city: Option<&str>,
    ) -> Result<Self, AddressError> {
        let (address, mask_length) = match start_address.split_once('/') {
            Some((address, mask)) => (address.trim(), ip_utils::parse_mask_length(mask)?),
            None => (start_address.trim(), ip_utils::mask_length_for_count(address_count)),
        };

        let address_dec = ip_utils::parse_dotted_quad(address)?;

        Ok(Self {
            country_iso_code: country_iso_code.to_string(),
            start_address: address.to_string(),
            address_count,
            assign_date,
            status_string: status_string.to_string(),
            city: city.map(str::to_string),
            countries,
            status: RecordStatus::from_status_str(status_string),
            mask_length,
            address_dec,
            is_network_valid: ip_utils::is_network_aligned(address_dec, mask_length),
        })
    }

    pub fn country_iso_code(&self) -> &str {
        &self.country_iso_code
    }

    /// Country name resolved through the shared code table
    pub fn country(&self) -> Option<&str> {
        self.countries.name(&self.country_iso_code)
    }

    pub fn start_address(&self) -> &str {
        &self.start_address
    }

    pub fn address_count(&self) -> i64 {
        self.address_count
    }

    /// Assignment date, `None` when the registry published no usable date
    pub fn assign_date(&self) -> Option<NaiveDate> {
        self.assign_date
    }

    pub fn status(&self) -> RecordStatus {
        self.status
    }

    pub fn status_string(&self) -> &str {
        &self.status_string
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub fn mask_length(&self) -> u8 {
        self.mask_length
    }

    pub fn address_dec(&self) -> u32 {
        self.address_dec
    }

    pub fn address(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.address_dec)
    }

    pub fn address_cidr(&self) -> String {
        format!("{}/{}", self.start_address, self.mask_length)
    }

    pub fn is_network_valid(&self) -> bool {
        self.is_network_valid
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("country_iso_code", &self.country_iso_code)
            .field("cidr", &self.address_cidr())
            .field("address_count", &self.address_count)
            .field("assign_date", &self.assign_date)
            .field("status", &self.status)
            .field("city", &self.city)
            .field("is_network_valid", &self.is_network_valid)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Arc<CountryCodeTable> {
        Arc::new(CountryCodeTable::parse("Japan, JP\nUnited States, US\n").unwrap())
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(RecordStatus::from_status_str("allocated"), RecordStatus::Allocated);
        assert_eq!(RecordStatus::from_status_str("ASSIGNED"), RecordStatus::Assigned);
        assert_eq!(RecordStatus::from_status_str(" Reserved "), RecordStatus::Reserved);
        assert_eq!(RecordStatus::from_status_str("available"), RecordStatus::Unknown);
        assert_eq!(RecordStatus::from_status_str(""), RecordStatus::Unknown);
        assert_eq!(RecordStatus::Allocated.to_string(), "ALLOCATED");
    }

    #[test]
    fn test_record_from_count() {
        let date = NaiveDate::from_ymd_opt(2003, 1, 1);
        let record = Record::new(table(), "JP", "202.0.0.0", 256, date, "allocated", None).unwrap();

        assert_eq!(record.country_iso_code(), "JP");
        assert_eq!(record.country(), Some("Japan"));
        assert_eq!(record.mask_length(), 24);
        assert_eq!(record.address_cidr(), "202.0.0.0/24");
        assert_eq!(record.address_dec(), 0xCA00_0000);
        assert_eq!(record.address(), Ipv4Addr::new(202, 0, 0, 0));
        assert_eq!(record.status(), RecordStatus::Allocated);
        assert_eq!(record.status_string(), "allocated");
        assert_eq!(record.assign_date(), date);
        assert!(record.is_network_valid());
        assert!(record.city().is_none());
    }

    #[test]
    fn test_record_with_explicit_prefix() {
        let record = Record::new(table(), "US", "10.0.0.0/8", 1, None, "assigned", Some("Austin")).unwrap();
        assert_eq!(record.start_address(), "10.0.0.0");
        assert_eq!(record.mask_length(), 8);
        assert_eq!(record.address_cidr(), "10.0.0.0/8");
        assert_eq!(record.city(), Some("Austin"));
    }

    #[test]
    fn test_network_validity_is_informational() {
        let aligned = Record::new(table(), "US", "192.0.2.0", 256, None, "assigned", None).unwrap();
        assert_eq!(aligned.address_dec(), 0xC000_0200);
        assert!(aligned.is_network_valid());

        let unaligned = Record::new(table(), "US", "192.0.2.1", 256, None, "assigned", None).unwrap();
        assert_eq!(unaligned.mask_length(), 24);
        assert!(!unaligned.is_network_valid());
    }

    #[test]
    fn test_cidr_round_trips_to_inputs() {
        let cases = [("192.0.2.0", 256, 24), ("198.51.100.0", 200, 24), ("203.0.113.7", 1, 32), ("100.64.0.0", 0, 32)];
        for (address, count, mask) in cases {
            let record = Record::new(table(), "US", address, count, None, "assigned", None).unwrap();
            let cidr = record.address_cidr();
            let (cidr_address, cidr_mask) = cidr.split_once('/').unwrap();
            assert_eq!(cidr_address, address);
            assert_eq!(cidr_mask.parse::<u8>().unwrap(), mask);
        }
    }

    #[test]
    fn test_invalid_address() {
        let table = table();
        assert!(Record::new(table.clone(), "US", "192.0.2", 256, None, "assigned", None).is_err());
        assert!(Record::new(table.clone(), "US", "192.0.2.999", 256, None, "assigned", None).is_err());
        assert!(Record::new(table, "US", "192.0.2.0/40", 256, None, "assigned", None).is_err());
    }

    #[test]
    fn test_unknown_country_code() {
        let record = Record::new(table(), "ZZ", "192.0.2.0", 256, None, "assigned", None).unwrap();
        assert_eq!(record.country(), None);
    }
}
