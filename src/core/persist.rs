//! Whole-collection JSON snapshots.
//!
//! Writes go to a uniquely named temp file in the target directory and are
//! then renamed over the snapshot, so readers never observe a truncated file.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::errors::ApiError;

pub fn encode_snapshot<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec_pretty(value).map_err(ApiError::internal)
}

/// Atomically replaces `path` with `bytes`.
pub async fn write_atomic(path: &Path, bytes: Vec<u8>) -> Result<(), ApiError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(ApiError::internal)?;
    }

    let tmp_path = temp_sibling(path);
    if let Err(err) = tokio::fs::write(&tmp_path, bytes).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(ApiError::internal(format!(
            "failed to write {}: {err}",
            tmp_path.display()
        )));
    }

    if let Err(err) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(ApiError::internal(format!(
            "failed to replace {}: {err}",
            path.display()
        )));
    }

    Ok(())
}

/// Reads a snapshot. `Ok(None)` when the file does not exist yet.
pub fn load_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ApiError> {
    let contents = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(ApiError::internal(err)),
    };

    serde_json::from_slice(&contents)
        .map(Some)
        .map_err(|e| ApiError::internal(format!("corrupt snapshot {}: {e}", path.display())))
}

fn temp_sibling(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "snapshot".to_string());
    path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn write_then_load_replaces_previous_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("items.json");

        let mut items = BTreeMap::new();
        items.insert("a".to_string(), 1);
        write_atomic(&path, encode_snapshot(&items).unwrap())
            .await
            .unwrap();

        items.insert("b".to_string(), 2);
        write_atomic(&path, encode_snapshot(&items).unwrap())
            .await
            .unwrap();

        let loaded: BTreeMap<String, i32> = load_snapshot(&path).unwrap().unwrap();
        assert_eq!(loaded, items);

        let leftovers = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn missing_snapshot_is_none_and_corrupt_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("absent.json");
        assert!(load_snapshot::<Vec<u8>>(&path).unwrap().is_none());

        std::fs::write(&path, b"{not json").unwrap();
        assert!(load_snapshot::<Vec<u8>>(&path).is_err());
    }
}
