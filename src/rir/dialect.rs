//! Registry dialects.
//!
//! The five registries publish the same delegation format with small
//! differences: the identifier in field 0, the header version token and
//! whether the date column may be left blank. Each registry also publishes
//! its files at its own FTP location with its own checksum layout.

use super::checksum::ChecksumLayout;
use super::package::ContentType;

/// A file published on a registry's FTP server and its local cache name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemotePath {
    pub path: &'static str,
    pub local_name: &'static str,
}

/// One delegation file a registry publishes, with its optional checksum file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishedFile {
    pub content_type: ContentType,
    pub data: RemotePath,
    pub checksum: Option<RemotePath>,
}

/// Where and how a registry publishes its statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Publication {
    pub ftp_host: &'static str,
    pub checksum_layout: ChecksumLayout,
    pub files: &'static [PublishedFile],
}

/// Parameters that drive the shared delegation-file parser for one registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    /// Value of field 0 on every data line and field 1 on the header
    pub identifier: &'static str,
    pub display_name: &'static str,
    /// Exact token expected in field 0 of the header line
    pub header_version: &'static str,
    /// A blank date column means "no date" instead of a parse error
    pub allow_blank_date: bool,
    pub publication: Publication,
}

pub const AFRINIC: Dialect = Dialect {
    identifier: "afrinic",
    display_name: "AFRINIC",
    header_version: "2",
    allow_blank_date: false,
    publication: Publication {
        ftp_host: "ftp.afrinic.net",
        checksum_layout: ChecksumLayout::KeyValue,
        files: &[PublishedFile {
            content_type: ContentType::COMBINED,
            data: RemotePath {
                path: "/pub/stats/afrinic/delegated-afrinic-latest",
                local_name: "AFRINIC-latest.db",
            },
            checksum: Some(RemotePath {
                path: "/pub/stats/afrinic/delegated-afrinic-latest.md5",
                local_name: "AFRINIC-latest.db.md5",
            }),
        }],
    },
};

pub const APNIC: Dialect = Dialect {
    identifier: "apnic",
    display_name: "APNIC",
    header_version: "2",
    allow_blank_date: false,
    publication: Publication {
        ftp_host: "ftp.apnic.net",
        checksum_layout: ChecksumLayout::KeyValue,
        files: &[PublishedFile {
            content_type: ContentType::COMBINED,
            data: RemotePath {
                path: "/pub/apnic/stats/apnic/delegated-apnic-latest",
                local_name: "APNIC-latest-delegated.db",
            },
            checksum: Some(RemotePath {
                path: "/pub/apnic/stats/apnic/delegated-apnic-latest.md5",
                local_name: "APNIC-latest-delegated.db.md5",
            }),
        }],
    },
};

pub const ARIN: Dialect = Dialect {
    identifier: "arin",
    display_name: "ARIN",
    header_version: "2.3",
    allow_blank_date: true,
    publication: Publication {
        ftp_host: "ftp.arin.net",
        checksum_layout: ChecksumLayout::FixedWidth,
        files: &[PublishedFile {
            content_type: ContentType::COMBINED,
            data: RemotePath {
                path: "/pub/stats/arin/delegated-arin-extended-latest",
                local_name: "ARIN-extended-latest.db",
            },
            checksum: Some(RemotePath {
                path: "/pub/stats/arin/delegated-arin-extended-latest.md5",
                local_name: "ARIN-extended-latest.db.md5",
            }),
        }],
    },
};

pub const RIPENCC: Dialect = Dialect {
    identifier: "ripencc",
    display_name: "RIPENCC",
    header_version: "2",
    allow_blank_date: false,
    publication: Publication {
        ftp_host: "ftp.ripe.net",
        checksum_layout: ChecksumLayout::KeyValue,
        files: &[PublishedFile {
            content_type: ContentType::COMBINED,
            data: RemotePath {
                path: "/pub/stats/ripencc/delegated-ripencc-latest",
                local_name: "RIPENCC-latest.db",
            },
            checksum: Some(RemotePath {
                path: "/pub/stats/ripencc/delegated-ripencc-latest.md5",
                local_name: "RIPENCC-latest.db.md5",
            }),
        }],
    },
};

pub const LACNIC: Dialect = Dialect {
    identifier: "lacnic",
    display_name: "LACNIC",
    header_version: "2",
    allow_blank_date: false,
    publication: Publication {
        ftp_host: "ftp.lacnic.net",
        checksum_layout: ChecksumLayout::KeyValue,
        files: &[PublishedFile {
            content_type: ContentType::COMBINED,
            data: RemotePath {
                path: "/pub/stats/lacnic/delegated-lacnic-latest",
                local_name: "LACNIC-latest.db",
            },
            checksum: Some(RemotePath {
                path: "/pub/stats/lacnic/delegated-lacnic-latest.md5",
                local_name: "LACNIC-latest.db.md5",
            }),
        }],
    },
};

/// Every supported registry, in the default processing order
pub static ALL_DIALECTS: [&Dialect; 5] = [&AFRINIC, &APNIC, &ARIN, &RIPENCC, &LACNIC];

/// Find a dialect by identifier or display name, ignoring case.
///
/// `"ripe"` is accepted as a shorthand for RIPE NCC.
pub fn lookup(name: &str) -> Option<&'static Dialect> {
    let name = name.trim();
    if name.eq_ignore_ascii_case("ripe") {
        return Some(&RIPENCC);
    }

    ALL_DIALECTS.iter().copied().find(|dialect| {
        dialect.identifier.eq_ignore_ascii_case(name) || dialect.display_name.eq_ignore_ascii_case(name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("apnic"), Some(&APNIC));
        assert_eq!(lookup("APNIC"), Some(&APNIC));
        assert_eq!(lookup(" Arin "), Some(&ARIN));
        assert_eq!(lookup("ripe"), Some(&RIPENCC));
        assert_eq!(lookup("RIPENCC"), Some(&RIPENCC));
        assert_eq!(lookup("iana"), None);
    }

    #[test]
    fn test_only_arin_differs() {
        for dialect in ALL_DIALECTS {
            if dialect.identifier == "arin" {
                assert_eq!(dialect.header_version, "2.3");
                assert!(dialect.allow_blank_date);
                assert_eq!(dialect.publication.checksum_layout, ChecksumLayout::FixedWidth);
            } else {
                assert_eq!(dialect.header_version, "2");
                assert!(!dialect.allow_blank_date);
                assert_eq!(dialect.publication.checksum_layout, ChecksumLayout::KeyValue);
            }
            assert!(!dialect.publication.files.is_empty());
        }
    }
}
