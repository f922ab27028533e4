use std::path::{Path, PathBuf};

use tokio::{fs, io};

/// Create a directory (and its parents) if it does not exist yet
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        return Ok(());
    }

    std::fs::create_dir_all(path)
}

/// Recursively list the files below `root` whose extension is one of `extensions`, sorted by path
pub async fn list_files(root: &Path, extensions: &[String]) -> io::Result<Vec<PathBuf>> {
    let mut pending = vec![root.to_path_buf()];
    let mut files = Vec::new();

    while let Some(dir) = pending.pop() {
        let mut entries = fs::read_dir(&dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if entry.file_type().await?.is_dir() {
                pending.push(path);
            } else if has_extension(&path, extensions) {
                files.push(path);
            }
        }
    }

    files.sort();

    Ok(files)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn ensure_dir_is_idempotent() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let nested = root.path().join("models").join("GRU");

        ensure_dir(&nested)?;
        ensure_dir(&nested)?;

        assert!(nested.is_dir());

        Ok(())
    }

    #[tokio::test]
    async fn lists_matching_files_recursively_in_order() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        std::fs::create_dir_all(root.path().join("b"))?;
        std::fs::write(root.path().join("b").join("two.c"), "int b;")?;
        std::fs::write(root.path().join("a.C"), "int a;")?;
        std::fs::write(root.path().join("notes.txt"), "skip me")?;

        let files = list_files(root.path(), &["c".to_string()]).await?;

        assert_eq!(
            files,
            vec![root.path().join("a.C"), root.path().join("b").join("two.c")]
        );

        Ok(())
    }
}
