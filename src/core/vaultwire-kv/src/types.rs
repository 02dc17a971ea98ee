//! Records exchanged with the KV v2 engine.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use vaultwire_mapper::{parse_duration, record, MapperError, Mapping};

record! {
    /// Engine-wide or per-path versioning settings.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct KvConfig {
        /// Number of versions kept per path (0 = server default).
        pub max_versions: u64 => "max_versions",
        /// Whether writes must carry a check-and-set version.
        pub cas_required: bool => "cas_required",
        /// Grace period before versions are deleted, e.g. `"10000000s"`.
        ///
        /// The server echoes this back normalized (`"2777h46m40s"`); compare with
        /// [`delete_version_after_duration`](Self::delete_version_after_duration).
        pub delete_version_after: String => "delete_version_after",
    }
}

impl KvConfig {
    /// Parses [`delete_version_after`](Self::delete_version_after); an empty
    /// value means no automatic deletion.
    pub fn delete_version_after_duration(&self) -> Result<Duration, MapperError> {
        if self.delete_version_after.is_empty() {
            return Ok(Duration::ZERO);
        }
        parse_duration(&self.delete_version_after)
    }
}

record! {
    /// State of a single secret version.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct KvMetadata {
        /// Version number.
        pub version: u64 => "version",
        /// Whether the version data was permanently destroyed.
        pub destroyed: bool => "destroyed",
        /// Creation time of the version.
        pub created_time: DateTime<Utc> => "created_time",
        /// Soft-deletion time; `None` while the version is live.
        pub deletion_time: Option<DateTime<Utc>> => "deletion_time",
        /// Custom metadata attached to the path.
        pub custom_metadata: Option<Mapping> => "custom_metadata",
    }
}

record! {
    /// Aggregate metadata of every version stored at a path.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct KvHistoryMetadata {
        /// Latest version number.
        pub current_version: u64 => "current_version",
        /// Per-path version limit (0 = engine setting).
        pub max_versions: u64 => "max_versions",
        /// Oldest version still tracked.
        pub oldest_version: u64 => "oldest_version",
        /// Creation time of the path.
        pub created_time: DateTime<Utc> => "created_time",
        /// Time of the latest write.
        pub updated_time: DateTime<Utc> => "updated_time",
        /// Version number (as text) to version metadata.
        pub versions: BTreeMap<String, KvMetadata> => "versions",
        /// Per-path check-and-set requirement.
        pub cas_required: bool => "cas_required",
        /// Per-path deletion grace period.
        pub delete_version_after: String => "delete_version_after",
        /// Custom metadata attached to the path.
        pub custom_metadata: Option<Mapping> => "custom_metadata",
    }
}

/// A secret payload together with its version metadata.
///
/// Either part may be missing from a response: a soft-deleted version has
/// metadata but no data, so `data` is left at its default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KvRecord<T> {
    /// Secret payload.
    pub data: T,
    /// Version metadata, when reported.
    pub metadata: Option<KvMetadata>,
}
