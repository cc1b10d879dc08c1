//! Persistent [`Token`] [`Storage`].

use std::{
    convert::Infallible,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;
use tracerr::Traced;

use crate::Token;

/// Key the [`Token`] is persisted under.
pub const TOKEN_KEY: &str = "token";

/// Storage persisting a single [`Token`] across restarts.
pub trait Storage {
    /// Error of this [`Storage`].
    type Err;

    /// Loads the persisted [`Token`], if any.
    ///
    /// # Errors
    ///
    /// Errors if the underlying storage cannot be read.
    fn load(&self) -> Result<Option<Token>, Self::Err>;

    /// Persists the provided [`Token`], replacing the previous one.
    ///
    /// # Errors
    ///
    /// Errors if the underlying storage cannot be written.
    fn store(&self, token: &Token) -> Result<(), Self::Err>;

    /// Removes the persisted [`Token`], if any.
    ///
    /// # Errors
    ///
    /// Errors if the underlying storage cannot be written.
    fn clear(&self) -> Result<(), Self::Err>;
}

/// [`Storage`] keeping the [`Token`] in a [`TOKEN_KEY`] file of a directory.
#[derive(Clone, Debug)]
pub struct FileStorage {
    /// Path to the [`Token`] file.
    path: PathBuf,
}

impl FileStorage {
    /// Creates a new [`FileStorage`] inside the provided directory.
    ///
    /// The directory is created lazily on the first [`Storage::store()`].
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(TOKEN_KEY),
        }
    }

    /// Returns the path of the [`Token`] file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for FileStorage {
    type Err = Traced<io::Error>;

    fn load(&self) -> Result<Option<Token>, Self::Err> {
        match fs::read_to_string(&self.path) {
            Ok(token) => {
                let token = token.trim();
                Ok((!token.is_empty()).then(|| Token::new(token)))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(tracerr::new!(e)),
        }
    }

    fn store(&self, token: &Token) -> Result<(), Self::Err> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(tracerr::wrap!())?;
        }
        fs::write(&self.path, token.as_ref()).map_err(tracerr::wrap!())
    }

    fn clear(&self) -> Result<(), Self::Err> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                Err(tracerr::new!(e))
            }
            Ok(()) | Err(_) => Ok(()),
        }
    }
}

/// In-memory [`Storage`].
///
/// Clones share the same [`Token`].
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    /// Stored [`Token`].
    token: Arc<Mutex<Option<Token>>>,
}

impl MemoryStorage {
    /// Creates a new empty [`MemoryStorage`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    type Err = Infallible;

    fn load(&self) -> Result<Option<Token>, Self::Err> {
        Ok(self.token.lock().clone())
    }

    fn store(&self, token: &Token) -> Result<(), Self::Err> {
        *self.token.lock() = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), Self::Err> {
        *self.token.lock() = None;
        Ok(())
    }
}

#[cfg(test)]
mod spec {
    use std::fs;

    use crate::Token;

    use super::{FileStorage, MemoryStorage, Storage as _, TOKEN_KEY};

    #[test]
    fn file_storage_persists_under_fixed_key() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));

        assert_eq!(storage.load().unwrap(), None);

        storage.store(&Token::new("abc")).unwrap();

        assert_eq!(storage.path(), dir.path().join("nested").join(TOKEN_KEY));
        assert_eq!(fs::read_to_string(storage.path()).unwrap(), "abc");
        assert_eq!(
            FileStorage::new(dir.path().join("nested")).load().unwrap(),
            Some(Token::new("abc")),
        );
    }

    #[test]
    fn file_storage_clears() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        storage.store(&Token::new("abc")).unwrap();

        storage.clear().unwrap();

        assert!(!storage.path().exists());
        assert_eq!(storage.load().unwrap(), None);
        storage.clear().unwrap();
    }

    #[test]
    fn file_storage_ignores_blank_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(TOKEN_KEY), "  \n").unwrap();

        assert_eq!(FileStorage::new(dir.path()).load().unwrap(), None);
    }

    #[test]
    fn memory_storage_is_shared_between_clones() {
        let storage = MemoryStorage::new();
        let other = storage.clone();

        storage.store(&Token::new("abc")).unwrap();
        assert_eq!(other.load().unwrap(), Some(Token::new("abc")));

        other.clear().unwrap();
        assert_eq!(storage.load().unwrap(), None);
    }
}
