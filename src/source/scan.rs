use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// All `.java` files under `root`, relative to it and sorted.
pub fn collect_java_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_java_files_recursive(root, root, &mut files)?;
    files.sort_by_key(|path| path_to_slash_string(path));
    Ok(files)
}

fn collect_java_files_recursive(root: &Path, current_dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs::read_dir(current_dir)
        .with_context(|| format!("failed to list directory `{}`", current_dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("failed to read entries in `{}`", current_dir.display()))?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .with_context(|| format!("failed to inspect `{}`", path.display()))?;
        if file_type.is_dir() {
            if should_skip_dir(entry.file_name().to_string_lossy().as_ref()) {
                continue;
            }
            collect_java_files_recursive(root, &path, files)?;
            continue;
        }

        if !file_type.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("java") {
            continue;
        }
        let relative = path.strip_prefix(root).with_context(|| {
            format!(
                "failed to strip project root `{}` from `{}`",
                root.display(),
                path.display()
            )
        })?;
        files.push(relative.to_path_buf());
    }

    Ok(())
}

fn should_skip_dir(name: &str) -> bool {
    matches!(
        name,
        "target" | "build" | "out" | ".git" | ".gradle" | ".idea" | ".vscode" | "node_modules"
    )
}

/// Entity ids use forward slashes on every platform.
pub fn path_to_slash_string(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{collect_java_files, path_to_slash_string};
    use crate::test_support::{remove_dir_if_exists, temp_project};

    #[test]
    fn collects_sorted_java_files_and_skips_build_output() {
        let root = temp_project(
            "scan",
            &[
                ("src/zoo/Dog.java", "class Dog {}"),
                ("src/zoo/Animal.java", "class Animal {}"),
                ("src/zoo/notes.txt", "not java"),
                ("build/generated/Gen.java", "class Gen {}"),
                (".git/objects/Odd.java", "class Odd {}"),
                ("App.java", "class App {}"),
            ],
        );

        let files = collect_java_files(&root).expect("scan project");
        let names = files.iter().map(|path| path_to_slash_string(path)).collect::<Vec<_>>();
        assert_eq!(names, vec!["App.java", "src/zoo/Animal.java", "src/zoo/Dog.java"]);

        remove_dir_if_exists(&root);
    }

    #[test]
    fn missing_root_is_an_error() {
        let error = collect_java_files(&PathBuf::from("/definitely/not/a/project/root"))
            .expect_err("missing root");
        assert!(format!("{error:#}").contains("failed to list directory"));
    }
}
