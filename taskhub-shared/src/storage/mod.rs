/// Image store for uploaded files
///
/// Records own at most one image, kept under a per-record randomly-named
/// directory: `{root}/{entity}/{token}/{filename}`. The random token
/// partitions the namespace so concurrent uploads never collide, and makes
/// "delete the record's image" equal to "remove the token directory",
/// co-located files included.
///
/// Replacing an image is a two-step compensating sequence driven by the
/// caller: store the new image, persist the new path, then remove the old
/// directory. A crash in between leaves an orphaned directory, never a row
/// pointing at a missing file.
///
/// # Example
///
/// ```no_run
/// use taskhub_shared::storage::ImageStore;
///
/// # async fn example() -> Result<(), taskhub_shared::storage::StorageError> {
/// let store = ImageStore::open("./uploads").await?;
///
/// let path = store.store("project", "logo.png", b"\x89PNG...").await?;
/// // path is e.g. "project/aB3xK9mQ2rT5wY7z/logo.png"
///
/// store.remove_record_dir(&path).await?;
/// # Ok(())
/// # }
/// ```

use std::path::{Component, Path, PathBuf};

use rand::{distributions::Alphanumeric, Rng};
use tracing::debug;

/// Length of the random directory token
const TOKEN_LEN: usize = 16;

/// Error type for image store operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem operation failed
    #[error("Storage i/o failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored path tried to escape the storage root
    #[error("Invalid storage path: {0}")]
    InvalidPath(String),
}

/// Handle on the image storage root directory
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    /// Creates a handle without touching the filesystem
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates a handle and ensures the root directory exists
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let store = Self::new(root);

        tokio::fs::create_dir_all(&store.root)
            .await
            .map_err(|e| StorageError::Io {
                path: store.root.clone(),
                source: e,
            })?;

        Ok(store)
    }

    /// Storage root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores an uploaded image under a fresh random directory
    ///
    /// Returns the relative path (`{entity}/{token}/{filename}`) to record
    /// on the row. The original filename is sanitized; an unusable name
    /// falls back to `"image"`.
    pub async fn store(
        &self,
        entity: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<String, StorageError> {
        let file_name = sanitize_file_name(original_name);
        let relative = format!("{}/{}/{}", entity, random_token(), file_name);
        let absolute = self.resolve(&relative)?;

        // The token directory is new by construction
        let dir = absolute.parent().expect("stored path always has a parent");
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| StorageError::Io {
                path: dir.to_path_buf(),
                source: e,
            })?;

        tokio::fs::write(&absolute, bytes)
            .await
            .map_err(|e| StorageError::Io {
                path: absolute.clone(),
                source: e,
            })?;

        debug!(path = %relative, size = bytes.len(), "Stored uploaded image");
        Ok(relative)
    }

    /// Removes the record directory containing `image_path`
    ///
    /// Deletes the whole `{entity}/{token}` directory, co-located files
    /// included. Removing an already-missing directory is not an error.
    pub async fn remove_record_dir(&self, image_path: &str) -> Result<(), StorageError> {
        let absolute = self.resolve(image_path)?;

        let dir = absolute
            .parent()
            .filter(|dir| *dir != self.root)
            .ok_or_else(|| StorageError::InvalidPath(image_path.to_string()))?;

        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => {
                debug!(path = %image_path, "Removed image directory");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io {
                path: dir.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Resolves a relative stored path against the root, rejecting anything
    /// that would escape it
    fn resolve(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let path = Path::new(relative);

        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes || relative.is_empty() {
            return Err(StorageError::InvalidPath(relative.to_string()));
        }

        Ok(self.root.join(path))
    }
}

/// Random 16-character alphanumeric directory token
fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Reduces a client-supplied filename to a safe basename
fn sanitize_file_name(name: &str) -> String {
    // Clients may send full paths; keep only the last segment
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("");

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "image".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> (tempfile::TempDir, ImageStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::open(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_store_writes_under_random_token_dir() {
        let (_dir, store) = temp_store().await;

        let path = store.store("project", "logo.png", b"png-bytes").await.unwrap();

        let segments: Vec<&str> = path.split('/').collect();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], "project");
        assert_eq!(segments[1].len(), TOKEN_LEN);
        assert!(segments[1].chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(segments[2], "logo.png");

        let contents = tokio::fs::read(store.root().join(&path)).await.unwrap();
        assert_eq!(contents, b"png-bytes");
    }

    #[tokio::test]
    async fn test_store_twice_uses_distinct_dirs() {
        let (_dir, store) = temp_store().await;

        let first = store.store("task", "a.png", b"1").await.unwrap();
        let second = store.store("task", "a.png", b"2").await.unwrap();

        assert_ne!(first, second);
        assert!(store.root().join(&first).exists());
        assert!(store.root().join(&second).exists());
    }

    #[tokio::test]
    async fn test_remove_record_dir_takes_siblings_with_it() {
        let (_dir, store) = temp_store().await;

        let path = store.store("project", "logo.png", b"png").await.unwrap();
        let token_dir = store.root().join(&path);
        let token_dir = token_dir.parent().unwrap();

        // A co-located file in the same record directory
        tokio::fs::write(token_dir.join("thumb.png"), b"thumb")
            .await
            .unwrap();

        store.remove_record_dir(&path).await.unwrap();

        assert!(!token_dir.exists());
    }

    #[tokio::test]
    async fn test_remove_record_dir_is_idempotent() {
        let (_dir, store) = temp_store().await;

        let path = store.store("task", "x.png", b"x").await.unwrap();
        store.remove_record_dir(&path).await.unwrap();

        // Second removal finds nothing and still succeeds
        store.remove_record_dir(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_rejects_escaping_paths() {
        let (_dir, store) = temp_store().await;

        assert!(store.remove_record_dir("../outside/file.png").await.is_err());
        assert!(store.remove_record_dir("/etc/passwd").await.is_err());
        assert!(store.remove_record_dir("").await.is_err());
        // A bare filename would resolve its parent to the root itself
        assert!(store.remove_record_dir("file.png").await.is_err());
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("logo.png"), "logo.png");
        assert_eq!(sanitize_file_name("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\pic.jpg"), "pic.jpg");
        assert_eq!(sanitize_file_name(""), "image");
        assert_eq!(sanitize_file_name(".."), "image");
    }

    #[test]
    fn test_random_token_shape() {
        let token = random_token();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
