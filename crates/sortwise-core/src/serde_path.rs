//! Lossy path serialization.
//!
//! File names are not guaranteed to be UTF-8, and serde's own `Path`
//! impl refuses those. Every path-bearing field routes through here with
//! `#[serde(serialize_with = ...)]` so that output never fails on an odd
//! name; invalid sequences become U+FFFD.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serializer;
use serde::ser::Serialize;

/// A single path.
pub fn lossy<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&path.to_string_lossy())
}

/// An optional path.
pub fn lossy_option<S: Serializer>(
    path: &Option<PathBuf>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match path {
        Some(path) => serializer.serialize_some(&path.to_string_lossy()),
        None => serializer.serialize_none(),
    }
}

/// A list of paths.
pub fn lossy_seq<S: Serializer>(paths: &[PathBuf], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(paths.iter().map(|p| p.to_string_lossy()))
}

/// A map keyed by path.
pub fn lossy_keys<V: Serialize, S: Serializer>(
    map: &BTreeMap<PathBuf, V>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(map.iter().map(|(k, v)| (k.to_string_lossy(), v)))
}

/// `(path, value)` pairs.
pub fn lossy_pairs<V: Serialize, S: Serializer>(
    pairs: &[(PathBuf, V)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(pairs.iter().map(|(p, v)| (p.to_string_lossy(), v)))
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use crate::{DirectoryProfile, FileRecord, ScanMode, ScanResult, UnitOutcome};

    use super::*;

    #[test]
    fn test_utf8_paths_unchanged() {
        let record = FileRecord::new("/photos/été.jpg", 1, SystemTime::UNIX_EPOCH);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["path"], "/photos/été.jpg");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_paths_serialize() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = Path::new("/r").join(OsStr::from_bytes(b"caf\xe9"));
        let file = dir.join("a.jpg");
        let records = vec![FileRecord::new(&file, 3, SystemTime::UNIX_EPOCH)];

        let mut result = ScanResult::new(vec![PathBuf::from("/r")], ScanMode::Tree);
        result.merge(UnitOutcome {
            profile: Some(DirectoryProfile::from_records(&dir, 0, &records)),
            records,
            ..Default::default()
        });

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["records"][0]["path"], "/r/caf\u{fffd}/a.jpg");
        assert!(value["profiles"].get("/r/caf\u{fffd}").is_some());

        let summary = serde_json::to_value(result.summary(5)).unwrap();
        assert_eq!(summary["largest_files"][0][0], "/r/caf\u{fffd}/a.jpg");
    }
}
