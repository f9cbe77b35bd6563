//! Package acquisition.
//!
//! Transport is a collaborator behind [`FileFetcher`]: it turns a remote file
//! reference into a fully transferred local path. Acquisition fetches every
//! file a registry publishes, verifies its checksum and assembles the
//! [`Package`]. A file that fails verification never reaches the parser.

use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, info};

use super::checksum::{self, ChecksumError, Verification};
use super::dialect::{Dialect, RemotePath};
use super::package::{Entry, Package};

/// A file on a registry's FTP server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub host: String,
    pub path: String,
    /// File name to use in the local cache
    pub local_name: String,
}

impl RemoteFile {
    pub fn new(host: &str, remote: &RemotePath) -> Self {
        Self {
            host: host.to_string(),
            path: remote.path.to_string(),
            local_name: remote.local_name.to_string(),
        }
    }

    pub fn url(&self) -> String {
        format!("ftp://{}{}", self.host, self.path)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{url} is not available as {} (offline mode)", path.display())]
    NotCached { url: String, path: PathBuf },

    #[error("Failed to transfer {url}: {reason}")]
    Transfer { url: String, reason: String },
}

/// Source of local copies of remote registry files
pub trait FileFetcher {
    fn fetch(&mut self, remote: &RemoteFile) -> Result<PathBuf, FetchError>;
}

/// Resolves remote files to copies already present in a cache directory
#[derive(Debug, Clone)]
pub struct CacheDirFetcher {
    cache_dir: PathBuf,
}

impl CacheDirFetcher {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

impl FileFetcher for CacheDirFetcher {
    fn fetch(&mut self, remote: &RemoteFile) -> Result<PathBuf, FetchError> {
        let path = self.cache_dir.join(&remote.local_name);
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => {
                info!(
                    "Offline mode. No file download for {}. Cached file size: {} bytes",
                    remote.local_name,
                    meta.len()
                );
                Ok(path)
            }
            _ => Err(FetchError::NotCached { url: remote.url(), path }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("Failed to fetch files for {registry}")]
    Fetch {
        registry: String,
        #[source]
        source: FetchError,
    },

    #[error("Verification failed for {registry}")]
    Checksum {
        registry: String,
        #[source]
        source: ChecksumError,
    },
}

/// Fetch, verify and package every file `dialect` publishes
pub fn acquire_package(dialect: &'static Dialect, fetcher: &mut dyn FileFetcher) -> Result<Package, AcquireError> {
    let publication = &dialect.publication;
    let fetch_error = |source| AcquireError::Fetch {
        registry: dialect.display_name.to_string(),
        source,
    };

    let mut entries = Vec::with_capacity(publication.files.len());
    for published in publication.files {
        let data_remote = RemoteFile::new(publication.ftp_host, &published.data);
        debug!("Requesting {}", data_remote.url());
        let data = fetcher.fetch(&data_remote).map_err(fetch_error)?;

        let checksum_file = match &published.checksum {
            Some(remote) => Some(
                fetcher
                    .fetch(&RemoteFile::new(publication.ftp_host, remote))
                    .map_err(fetch_error)?,
            ),
            None => None,
        };

        let verification = checksum::verify_file(&data, checksum_file.as_deref(), publication.checksum_layout)
            .map_err(|source| AcquireError::Checksum {
                registry: dialect.display_name.to_string(),
                source,
            })?;
        if let Verification::Verified { digest } = &verification {
            info!("Verified {} ({})", data.display(), digest);
        }

        let identifier = format!("LATEST_{}", published.content_type.label());
        entries.push(Entry::new(data, identifier, published.content_type, dialect));
    }

    Ok(Package::new(dialect.display_name, Utc::now(), entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rir::dialect::{APNIC, ARIN};
    use crate::rir::package::ContentType;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    /// MD5 of the ASCII bytes "hello world"
    const HELLO_MD5: &str = "5eb63bbbe01eeed093cb22bb8f5acdc3";

    /// Serves files from a fixed path map and records every request
    struct MapFetcher {
        files: HashMap<String, PathBuf>,
        requested: Vec<String>,
    }

    impl FileFetcher for MapFetcher {
        fn fetch(&mut self, remote: &RemoteFile) -> Result<PathBuf, FetchError> {
            self.requested.push(remote.url());
            self.files.get(&remote.path).cloned().ok_or_else(|| FetchError::Transfer {
                url: remote.url(),
                reason: "not found".to_string(),
            })
        }
    }

    #[test]
    fn test_remote_file_url() {
        let remote = RemoteFile::new(APNIC.publication.ftp_host, &APNIC.publication.files[0].data);
        assert_eq!(remote.url(), "ftp://ftp.apnic.net/pub/apnic/stats/apnic/delegated-apnic-latest");
        assert_eq!(remote.local_name, "APNIC-latest-delegated.db");
    }

    #[test]
    fn test_cache_dir_fetcher() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("APNIC-latest-delegated.db"), "hello world").unwrap();

        let mut fetcher = CacheDirFetcher::new(dir.path());
        let remote = RemoteFile::new(APNIC.publication.ftp_host, &APNIC.publication.files[0].data);
        assert_eq!(fetcher.fetch(&remote).unwrap(), dir.path().join("APNIC-latest-delegated.db"));

        let missing = RemoteFile::new(ARIN.publication.ftp_host, &ARIN.publication.files[0].data);
        assert!(matches!(fetcher.fetch(&missing), Err(FetchError::NotCached { .. })));
    }

    #[test]
    fn test_acquire_verified_package() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("APNIC-latest-delegated.db"), "hello world").unwrap();
        fs::write(
            dir.path().join("APNIC-latest-delegated.db.md5"),
            format!("MD5 (delegated-apnic-latest) = {}\n", HELLO_MD5),
        )
        .unwrap();

        let mut fetcher = CacheDirFetcher::new(dir.path());
        let package = acquire_package(&APNIC, &mut fetcher).unwrap();
        assert_eq!(package.registry(), "APNIC");
        assert_eq!(package.entry_count(), 1);

        let entry = &package.entries()[0];
        assert_eq!(entry.identifier(), "LATEST_COMBINED");
        assert_eq!(entry.content_type(), ContentType::COMBINED);
        assert_eq!(entry.dialect().identifier, "apnic");
        assert!(!entry.is_scanned());
    }

    #[test]
    fn test_acquire_rejects_corrupted_file() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("arin.db");
        let checksum = dir.path().join("arin.db.md5");
        fs::write(&data, "hello world, tampered").unwrap();
        fs::write(&checksum, format!("{}  delegated-arin-extended-latest\n", HELLO_MD5)).unwrap();

        let mut fetcher = MapFetcher {
            files: HashMap::from([
                (ARIN.publication.files[0].data.path.to_string(), data),
                (ARIN.publication.files[0].checksum.unwrap().path.to_string(), checksum),
            ]),
            requested: Vec::new(),
        };

        let result = acquire_package(&ARIN, &mut fetcher);
        assert!(matches!(
            result,
            Err(AcquireError::Checksum {
                source: ChecksumError::VerificationFailed { .. },
                ..
            })
        ));
        assert_eq!(fetcher.requested.len(), 2);
    }

    #[test]
    fn test_acquire_fails_when_checksum_missing_from_cache() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("APNIC-latest-delegated.db"), "hello world").unwrap();

        let mut fetcher = CacheDirFetcher::new(dir.path());
        let result = acquire_package(&APNIC, &mut fetcher);
        assert!(matches!(
            result,
            Err(AcquireError::Fetch {
                source: FetchError::NotCached { .. },
                ..
            })
        ));
    }
}
