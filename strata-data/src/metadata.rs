//! The `metadata.json` sidecar written next to the layer files.

use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pbf::{HeaderError, ReplicationHeader, read_header};

/// File name of the sidecar inside the output directory.
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Dataset provenance copied from the input header.
///
/// # Examples
/// ```
/// use strata_data::{DatasetMetadata, ReplicationHeader};
///
/// let metadata = DatasetMetadata::from_header(ReplicationHeader {
///     timestamp: Some(1_700_000_000),
///     sequence_number: Some(4242),
/// });
/// assert_eq!(metadata.timestamp.as_deref(), Some("2023-11-14T22:13:20Z"));
/// assert_eq!(metadata.seqno, Some(4242));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    /// Replication timestamp in RFC 3339, or `null`.
    pub timestamp: Option<String>,
    /// Replication sequence number, or `null`.
    ///
    /// Written as a JSON number. Sidecars produced by osmium-based tooling
    /// carry the header option verbatim, as a string such as `"4242"`.
    pub seqno: Option<i64>,
}

impl DatasetMetadata {
    /// Build the sidecar from decoded header fields.
    #[must_use]
    pub fn from_header(header: ReplicationHeader) -> Self {
        Self {
            timestamp: header
                .timestamp
                .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
                .map(|instant| instant.to_rfc3339_opts(SecondsFormat::Secs, true)),
            seqno: header.sequence_number,
        }
    }

    /// Read the header of the PBF file at `path`.
    ///
    /// # Errors
    /// Propagates [`HeaderError`] when the header cannot be read.
    pub fn from_pbf(path: &Path) -> Result<Self, MetadataError> {
        Ok(Self::from_header(read_header(path)?))
    }

    /// Pretty-printed JSON with a trailing newline.
    ///
    /// # Errors
    /// Fails only if serialisation fails.
    pub fn to_json(&self) -> Result<String, MetadataError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Write `metadata.json` into `output_dir`, returning its path.
    ///
    /// # Errors
    /// Returns [`MetadataError::Write`] when the file cannot be written.
    pub fn write_to(&self, output_dir: &Utf8Path) -> Result<Utf8PathBuf, MetadataError> {
        let path = output_dir.join(METADATA_FILE_NAME);
        let json = self.to_json()?;
        strata_fs::write_file(&path, json.as_bytes()).map_err(|source| MetadataError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// Errors raised while producing the sidecar.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The input header could not be read.
    #[error(transparent)]
    Header(#[from] HeaderError),
    /// The document could not be serialised.
    #[error("failed to serialise dataset metadata")]
    Encode(#[from] serde_json::Error),
    /// The sidecar could not be written.
    #[error("failed to write {path}")]
    Write {
        /// Target path.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn missing_header_fields_serialise_as_null() {
        let json = DatasetMetadata::default().to_json().expect("encode");
        assert_eq!(json, "{\n  \"timestamp\": null,\n  \"seqno\": null\n}\n");
    }

    #[rstest]
    fn sequence_number_serialises_as_a_number() {
        let metadata = DatasetMetadata::from_header(ReplicationHeader {
            timestamp: None,
            sequence_number: Some(4242),
        });
        let json = metadata.to_json().expect("encode");
        assert_eq!(json, "{\n  \"timestamp\": null,\n  \"seqno\": 4242\n}\n");
    }

    #[rstest]
    fn writes_the_sidecar_into_the_output_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = Utf8Path::from_path(dir.path()).expect("UTF-8 temp dir");
        let metadata = DatasetMetadata {
            timestamp: Some("2024-05-01T00:00:00Z".to_owned()),
            seqno: Some(7),
        };
        let path = metadata.write_to(root).expect("write sidecar");
        assert_eq!(path, root.join(METADATA_FILE_NAME));
        let contents = std::fs::read_to_string(&path).expect("read sidecar");
        let decoded: DatasetMetadata = serde_json::from_str(&contents).expect("decode");
        assert_eq!(decoded, metadata);
        assert!(contents.ends_with("}\n"));
    }
}
