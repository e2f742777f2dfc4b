use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Write `contents` to `path` via a sibling temp file and rename.
///
/// A crash leaves either the previous file or the complete new one, never a
/// torn write. The temp file lives next to the target so the rename stays on
/// one filesystem.
pub fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let temp_path = temp_sibling(path);

    let result = (|| {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(contents)?;
        // Data must hit the disk before the rename publishes it
        file.sync_all()?;
        drop(file);

        // Keep the original permission bits when replacing an existing file
        if let Ok(meta) = fs::metadata(path) {
            fs::set_permissions(&temp_path, meta.permissions())?;
        }

        fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("config"));
    name.push(".mlaunch-tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_content_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot_config.toml");
        fs::write(&path, "port = 1\n").unwrap();

        atomic_write(&path, b"port = 2\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "port = 2\n");
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.json");
        atomic_write(&path, b"{}").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{}");
    }

    #[test]
    fn failure_cleans_up_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // Renaming a file over a non-empty directory fails
        let target = dir.path().join("occupied");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("inner"), "x").unwrap();

        assert!(atomic_write(&target, b"data").is_err());
        assert!(!temp_sibling(&target).exists());
    }
}
