//! Checksum verification for downloaded delegation files.
//!
//! Registries publish an MD5 file next to each delegation file. Most use a
//! `MD5 (name) = <digest>` line; ARIN publishes `<digest>  <name>`.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{debug, error, warn};
use md5::{Digest, Md5};
use regex::Regex;

/// Length of a hex-encoded MD5 digest
const DIGEST_HEX_LEN: usize = 32;

static HEX_DIGEST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Fa-f]{32}$").expect("Invalid digest regex"));

/// Layout of a registry checksum file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumLayout {
    /// `key = value`; the digest follows the last `=`
    KeyValue,
    /// The digest is the first 32 characters of the line
    FixedWidth,
}

/// Errors raised while verifying a downloaded file
#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    #[error("Unexpected checksum format in {}: {reason}", file.display())]
    FormatInvalid {
        file: PathBuf,
        line: String,
        reason: String,
    },

    #[error("File verification failed for {}: expected {expected} but got {actual}", file.display())]
    VerificationFailed {
        file: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Failed to read {}", file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Outcome of a successful verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Verified { digest: String },
    /// No checksum file was published for this data file
    Skipped,
}

/// MD5 digest of a file as uppercase hexadecimal
pub fn compute_digest(path: &Path) -> Result<String, ChecksumError> {
    let io_error = |source| ChecksumError::Io {
        file: path.to_path_buf(),
        source,
    };

    let mut reader = BufReader::with_capacity(64 * 1024, File::open(path).map_err(io_error)?);
    let mut hasher = Md5::new();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        let read = reader.read(&mut buffer).map_err(io_error)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02X}", byte))
        .collect())
}

/// Extract the expected digest from checksum file content.
///
/// `file` is only used for error reporting.
pub fn parse_expected_digest(layout: ChecksumLayout, content: &str, file: &Path) -> Result<String, ChecksumError> {
    let format_error = |line: &str, reason: &str| ChecksumError::FormatInvalid {
        file: file.to_path_buf(),
        line: line.to_string(),
        reason: reason.to_string(),
    };

    let line = content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| format_error("", "file is empty"))?;

    let digest = match layout {
        ChecksumLayout::KeyValue => line
            .rsplit_once('=')
            .map(|(_, value)| value.trim())
            .ok_or_else(|| format_error(line, "line has no '=' separator"))?,
        ChecksumLayout::FixedWidth => line
            .get(..DIGEST_HEX_LEN)
            .ok_or_else(|| format_error(line, "line is shorter than a digest"))?,
    };

    if !HEX_DIGEST.is_match(digest) {
        return Err(format_error(line, "value is not a 32 digit hexadecimal digest"));
    }

    Ok(digest.to_string())
}

/// Verify `data` against its published checksum file.
///
/// A missing checksum file is not an error: verification is skipped with a
/// warning. A mismatch is always fatal.
pub fn verify_file(data: &Path, checksum: Option<&Path>, layout: ChecksumLayout) -> Result<Verification, ChecksumError> {
    let Some(checksum) = checksum else {
        warn!(
            "Skipping verification for local file {} because no checksum file is published for it",
            data.display()
        );
        return Ok(Verification::Skipped);
    };

    let content = std::fs::read_to_string(checksum).map_err(|source| ChecksumError::Io {
        file: checksum.to_path_buf(),
        source,
    })?;
    let expected = parse_expected_digest(layout, &content, checksum)?;
    let actual = compute_digest(data)?;

    if !actual.eq_ignore_ascii_case(&expected) {
        error!(
            "File verification failed for local file {}. Expected {} but got {}",
            data.display(),
            expected,
            actual
        );
        return Err(ChecksumError::VerificationFailed {
            file: data.to_path_buf(),
            expected,
            actual,
        });
    }

    debug!("File verification succeeded for local file {}. Hash {}", data.display(), actual);
    Ok(Verification::Verified { digest: actual })
}
