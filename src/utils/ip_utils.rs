//! IPv4 address and CIDR arithmetic.
//!
//! Delegation files describe blocks as a dotted-decimal start address plus an
//! address count. These helpers turn that pair into a numeric address and a
//! prefix length.

use std::net::Ipv4Addr;

/// Errors produced while interpreting dotted-decimal IPv4 text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("Invalid IPv4 address '{address}': expected 4 octets, found {found}")]
    OctetCount { address: String, found: usize },

    #[error("Invalid IPv4 address '{address}': octet '{octet}' is not in 0-255")]
    OctetRange { address: String, octet: String },

    #[error("Invalid prefix length '{0}'")]
    MaskLength(String),
}

/// Parse a dotted-decimal address into its 32-bit value.
///
/// The first octet is the most significant byte.
///
/// # Examples
/// ```
/// use rirdb::utils::ip_utils::parse_dotted_quad;
///
/// assert_eq!(parse_dotted_quad("192.0.2.0"), Ok(0xC000_0200));
/// assert!(parse_dotted_quad("192.0.2").is_err());
/// assert!(parse_dotted_quad("192.0.2.256").is_err());
/// ```
pub fn parse_dotted_quad(address: &str) -> Result<u32, AddressError> {
    let octets: Vec<&str> = address.split('.').collect();
    if octets.len() != 4 {
        return Err(AddressError::OctetCount {
            address: address.to_string(),
            found: octets.len(),
        });
    }

    let mut value: u32 = 0;
    for octet in octets {
        let byte = octet.trim().parse::<u8>().map_err(|_| AddressError::OctetRange {
            address: address.to_string(),
            octet: octet.to_string(),
        })?;
        value = (value << 8) | u32::from(byte);
    }

    Ok(value)
}

/// Render a 32-bit value back into dotted-decimal form
pub fn format_dotted_quad(value: u32) -> String {
    Ipv4Addr::from(value).to_string()
}

/// Parse an explicit prefix length such as the `24` in `10.0.0.0/24`
pub fn parse_mask_length(text: &str) -> Result<u8, AddressError> {
    match text.trim().parse::<u8>() {
        Ok(mask) if mask <= 32 => Ok(mask),
        _ => Err(AddressError::MaskLength(text.to_string())),
    }
}

/// Smallest prefix length whose block holds `count` addresses.
///
/// Counts below one collapse to a single host (`/32`). Counts that are not a
/// power of two round up to the next enclosing block.
///
/// # Examples
/// ```
/// use rirdb::utils::ip_utils::mask_length_for_count;
///
/// assert_eq!(mask_length_for_count(256), 24);
/// assert_eq!(mask_length_for_count(200), 24);
/// assert_eq!(mask_length_for_count(1), 32);
/// assert_eq!(mask_length_for_count(0), 32);
/// ```
pub fn mask_length_for_count(count: i64) -> u8 {
    if count < 1 {
        return 32;
    }

    // ceil(log2(count)) without floating point
    let host_bits = 64 - (count as u64 - 1).leading_zeros();
    32u32.saturating_sub(host_bits) as u8
}

/// Network mask for a prefix length, e.g. `/24` -> `0xFFFFFF00`
pub fn network_mask(mask_length: u8) -> u32 {
    match mask_length {
        0 => 0,
        m if m >= 32 => u32::MAX,
        m => u32::MAX << (32 - u32::from(m)),
    }
}

/// True when `address` has no bits set outside its network prefix
pub fn is_network_aligned(address: u32, mask_length: u8) -> bool {
    address & network_mask(mask_length) == address
}
