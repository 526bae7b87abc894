//! Run identifiers and handles
//!
//! A run is named by its UTC start time at second granularity
//! (`YYYYMMDD_HHMMSS`), so lexicographic order of the names is
//! chronological order.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::error::StorageError;
use super::layout::{ArtifactPaths, Stage};

/// chrono format string of a run identifier
pub const RUN_ID_FORMAT: &str = "%Y%m%d_%H%M%S";

const RUN_ID_LEN: usize = 15;

/// Sortable identifier of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunId(String);

impl RunId {
    /// Build the identifier for a start time
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.format(RUN_ID_FORMAT).to_string())
    }

    /// Parse a directory name, returning `None` when it is not a run id
    pub fn parse(value: &str) -> Option<Self> {
        let bytes = value.as_bytes();
        if bytes.len() != RUN_ID_LEN || bytes[8] != b'_' {
            return None;
        }
        if !value
            .bytes()
            .enumerate()
            .all(|(i, b)| i == 8 || b.is_ascii_digit())
        {
            return None;
        }
        NaiveDateTime::parse_from_str(value, RUN_ID_FORMAT)
            .ok()
            .map(|_| Self(value.to_string()))
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Start time encoded in the identifier
    pub fn timestamp(&self) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(&self.0, RUN_ID_FORMAT)
            .map(|naive| naive.and_utc())
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// The identifier one second later
    pub fn successor(&self) -> Self {
        Self::from_datetime(self.timestamp() + Duration::seconds(1))
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RunId {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| StorageError::InvalidRunId(s.to_string()))
    }
}

impl TryFrom<String> for RunId {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RunId> for String {
    fn from(id: RunId) -> Self {
        id.0
    }
}

/// A run together with its directory under the artifact root
///
/// Created once by the orchestrator and handed to every stage, so all stages
/// of an invocation read and write the same run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
    id: RunId,
    dir: PathBuf,
}

impl RunHandle {
    pub(crate) fn new(id: RunId, dir: PathBuf) -> Self {
        Self { id, dir }
    }

    pub fn id(&self) -> &RunId {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Directory of one stage's artifact set
    pub fn stage_dir(&self, stage: Stage) -> PathBuf {
        self.dir.join(stage.dir_name())
    }

    /// Canonical artifact paths of this run
    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths::new(self.dir.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_run_id_format() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(RunId::from_datetime(at).as_str(), "20240102_030405");
    }

    #[test]
    fn test_parse_rejects_foreign_names() {
        assert!(RunId::parse("20240102_030405").is_some());
        assert!(RunId::parse("latest").is_none());
        assert!(RunId::parse("20240102-030405").is_none());
        assert!(RunId::parse("20241302_030405").is_none());
        assert!(RunId::parse("2024010203040").is_none());
        assert!(RunId::parse("+0240102_030405").is_none());
    }

    #[test]
    fn test_successor_crosses_midnight() {
        let id = RunId::parse("20231231_235959").unwrap();
        assert_eq!(id.successor().as_str(), "20240101_000000");
    }

    #[test]
    fn test_ordering_is_chronological() {
        let a = RunId::parse("20240101_000000").unwrap();
        let b = RunId::parse("20240102_000000").unwrap();
        assert!(a < b);
        assert!(a.timestamp() < b.timestamp());
    }

    #[test]
    fn test_serde_as_plain_string() {
        let id = RunId::parse("20240101_120000").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"20240101_120000\"");
        let back: RunId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<RunId>("\"nope\"").is_err());
    }
}
