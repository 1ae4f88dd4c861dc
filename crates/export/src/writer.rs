//! JSON emission of assembled documents.

use adl_core::Result;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Serialize `document` to `path`, creating parent directories. Returns the file size
/// in bytes.
pub fn write_document<T: Serialize>(path: &Path, document: &T, pretty: bool) -> Result<u64> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    if pretty {
        serde_json::to_writer_pretty(&mut writer, document)?;
    } else {
        serde_json::to_writer(&mut writer, document)?;
    }
    writer.flush()?;

    let size = std::fs::metadata(path)?.len();
    info!(
        path = %path.display(),
        size_mb = %format!("{:.2}", size as f64 / (1024.0 * 1024.0)),
        "Saved document"
    );
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_writes_pretty_json_into_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("public").join("data").join("doc.json");
        let doc = json!({"metadata": {"eventCount": 1}});

        let size = write_document(&path, &doc, true).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(size, written.len() as u64);
        assert!(written.contains("\n  \"metadata\": {\n    \"eventCount\": 1\n  }"));
        let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_writes_compact_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        write_document(&path, &json!({"a": [1, 2]}), false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"a":[1,2]}"#);
    }
}
