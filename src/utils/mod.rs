//! Shared utilities: IPv4 address and prefix arithmetic.

pub mod ip_utils;

pub use ip_utils::{
    format_dotted_quad, is_network_aligned, mask_length_for_count, network_mask, parse_dotted_quad,
    parse_mask_length, AddressError,
};
