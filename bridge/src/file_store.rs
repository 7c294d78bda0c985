use anyhow::{bail, Context, Result};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Blob store rooted at a directory; paths are `/`-separated and relative.
#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("failed to create file store at {}", root.display()))?;
        Ok(Self { root })
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        if path.is_empty() {
            bail!("file store path is empty");
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                Component::CurDir => {}
                _ => bail!("file store path {} must stay inside the store", path),
            }
        }
        Ok(self.root.join(relative))
    }

    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        tokio::fs::read(&full)
            .await
            .with_context(|| format!("failed to read {}", path))
    }

    pub async fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // write then rename so readers never see a partial file
        let staging = full.with_extension("tmp");
        tokio::fs::write(&staging, content)
            .await
            .with_context(|| format!("failed to write {}", path))?;
        tokio::fs::rename(&staging, &full).await?;
        Ok(())
    }

    /// Deleting a path that does not exist is not an error.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to delete {}", path)),
        }
    }

    /// Files directly under `prefix` (e.g. `brand/`), as store-relative paths.
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let dir_name = prefix.trim_end_matches('/');
        let dir = self.resolve(dir_name)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("failed to list {}", prefix)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".tmp") {
                continue;
            }
            files.push(format!("{}/{}", dir_name, name));
        }
        files.sort();
        Ok(files)
    }
}
