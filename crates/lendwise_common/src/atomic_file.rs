//! Atomic JSON file operations.
//!
//! Writes go to a fresh temp file in the target's directory, are synced to
//! disk, then renamed over the target. Readers see either the old content or
//! the new content, never a partial file.

use crate::error::{LendwiseError, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Directory that holds `path`, treating a bare file name as the cwd.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
///
/// On failure the temp file is removed and `path` keeps its previous content.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir).map_err(|e| LendwiseError::persistence(path, e))?;

    let prefix = format!(
        "{}.",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "state".to_string())
    );

    // NamedTempFile deletes itself on drop, which covers every early return below.
    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| LendwiseError::persistence(path, e))?;

    write_and_sync(tmp.as_file_mut(), value).map_err(|e| LendwiseError::persistence(path, e))?;

    tmp.persist(path)
        .map_err(|e| LendwiseError::persistence(path, e.error))?;

    // Make the rename itself durable; not every platform lets us open a directory.
    if let Ok(d) = File::open(dir) {
        let _ = d.sync_all();
    }

    debug!("Atomically wrote {}", path.display());
    Ok(())
}

fn write_and_sync<T: Serialize + ?Sized>(file: &mut File, value: &T) -> io::Result<()> {
    {
        let mut writer = io::BufWriter::new(&mut *file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    file.sync_all()
}

/// Read and parse a JSON file.
///
/// Returns `None` when the file is missing, unreadable or not valid JSON.
/// A corrupt file is treated as "no data yet" and never fails the caller.
pub fn read_json(path: &Path) -> Option<Value> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring corrupt JSON in {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::{Error as _, SerializeMap, Serializer};
    use serde_json::json;
    use tempfile::tempdir;

    /// Emits one map entry and then fails, like a disk filling up mid-write.
    struct FailsHalfway;

    impl Serialize for FailsHalfway {
        fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(None)?;
            map.serialize_entry("partial", "data")?;
            Err(S::Error::custom("simulated write failure"))
        }
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("decisions.json");

        write_json(&path, &json!({"C101": {"decision": "APPROVE"}})).unwrap();

        let value = read_json(&path).unwrap();
        assert_eq!(value["C101"]["decision"], "APPROVE");
        // Pretty-printed with trailing newline
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  \"C101\""));
        assert!(raw.ends_with('\n'));
    }

    #[test]
    fn test_write_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/state/session.json");

        write_json(&path, &json!({"sessions": {}})).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_failed_write_leaves_original_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("decisions.json");
        write_json(&path, &json!({"C101": "kept"})).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let err = write_json(&path, &FailsHalfway).unwrap_err();
        assert!(matches!(err, LendwiseError::Persistence { .. }));

        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        // No stray temp files left behind
        assert_eq!(dir_entries(dir.path()), vec!["decisions.json".to_string()]);
    }

    #[test]
    fn test_failed_rename_cleans_temp_file() {
        let dir = tempdir().unwrap();
        // A directory at the target path makes the final rename fail.
        let path = dir.path().join("blocked.json");
        fs::create_dir(&path).unwrap();

        let err = write_json(&path, &json!({"a": 1})).unwrap_err();
        assert!(matches!(err, LendwiseError::Persistence { .. }));
        assert_eq!(dir_entries(dir.path()), vec!["blocked.json".to_string()]);
    }

    #[test]
    fn test_read_missing_file_is_none() {
        let dir = tempdir().unwrap();
        assert!(read_json(&dir.path().join("absent.json")).is_none());
    }

    #[test]
    fn test_read_corrupt_file_is_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{\"sessions\": {\"abc\": [").unwrap();
        assert!(read_json(&path).is_none());
    }

    #[test]
    fn test_parent_dir_of_bare_name() {
        assert_eq!(parent_dir(Path::new("decisions.json")), Path::new("."));
        assert_eq!(parent_dir(Path::new("/var/lib/x.json")), Path::new("/var/lib"));
    }
}
