//! Replication fields of the OSM PBF header block.

use std::path::{Path, PathBuf};

use osmpbf::{BlobDecode, BlobReader, HeaderBlock};
use thiserror::Error;

/// Replication state recorded by the tool that produced the extract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplicationHeader {
    /// `osmosis_replication_timestamp`, in seconds since the Unix epoch.
    pub timestamp: Option<i64>,
    /// `osmosis_replication_sequence_number`.
    pub sequence_number: Option<i64>,
}

impl From<&HeaderBlock> for ReplicationHeader {
    fn from(block: &HeaderBlock) -> Self {
        Self {
            timestamp: block.osmosis_replication_timestamp(),
            sequence_number: block.osmosis_replication_sequence_number(),
        }
    }
}

/// Errors raised while reading the PBF header block.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// The file could not be opened or its first blob could not be decoded.
    #[error("failed to read OSM PBF header from {path:?}")]
    Read {
        /// Input path.
        path: PathBuf,
        /// Underlying decoder error.
        #[source]
        source: osmpbf::Error,
    },
    /// The file does not start with an `OSMHeader` blob.
    #[error("{path:?} does not start with an OSM PBF header block")]
    MissingHeader {
        /// Input path.
        path: PathBuf,
    },
}

/// Read the replication fields from the header block of `path`.
///
/// # Errors
/// Returns [`HeaderError::Read`] when the file cannot be opened or decoded
/// and [`HeaderError::MissingHeader`] when the first blob is not a header.
pub fn read_header(path: &Path) -> Result<ReplicationHeader, HeaderError> {
    let read_error = |source| HeaderError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut blobs = BlobReader::from_path(path).map_err(read_error)?;
    let blob = blobs
        .next()
        .ok_or_else(|| HeaderError::MissingHeader {
            path: path.to_path_buf(),
        })?
        .map_err(read_error)?;
    match blob.decode().map_err(read_error)? {
        BlobDecode::OsmHeader(block) => Ok(ReplicationHeader::from(block.as_ref())),
        BlobDecode::OsmData(_) | BlobDecode::Unknown(_) => Err(HeaderError::MissingHeader {
            path: path.to_path_buf(),
        }),
    }
}
