use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_path(prefix: &str) -> PathBuf {
    let now_ns = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "class_plane_{prefix}_{}_{}",
        std::process::id(),
        now_ns
    ))
}

/// Write `files` (relative path, contents) under a fresh temp directory.
pub fn temp_project(prefix: &str, files: &[(&str, &str)]) -> PathBuf {
    let root = temp_path(prefix);
    for (relative, contents) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create project dirs");
        }
        std::fs::write(&path, contents).expect("write project file");
    }
    std::fs::create_dir_all(&root).expect("create project root");
    root
}

pub fn remove_dir_if_exists(path: &Path) {
    let _ = std::fs::remove_dir_all(path);
}
