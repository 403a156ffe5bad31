use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::{
    collections::BTreeMap,
    fs,
    path::{
        Path,
        PathBuf,
    },
};

/// Key of the flag that asks the header to reconnect on the next start.
pub const CONNECTED_KEY: &str = "connected";
/// Value stored under [`CONNECTED_KEY`]; names the connector that was used.
pub const INJECTED_CONNECTOR: &str = "inject";
pub const STORAGE_FILE: &str = "local_storage.json";

/// String key/value storage that survives restarts of the client.
pub trait ClientStorage {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&mut self, key: &str) -> Result<()>;
}

/// JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: BTreeMap<String, String>,
}

impl FileStorage {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let items = if path.exists() {
            let data = fs::read(&path).wrap_err_with(|| {
                format!("Failed to read client storage {}", path.display())
            })?;
            if data.iter().all(u8::is_ascii_whitespace) {
                BTreeMap::new()
            } else {
                serde_json::from_slice(&data).map_err(|e| {
                    eyre!("Client storage {} is not a JSON object: {e}", path.display())
                })?
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, items })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).wrap_err_with(|| {
                format!("Failed to create storage directory {}", parent.display())
            })?;
        }
        let json = serde_json::to_vec_pretty(&self.items)
            .wrap_err("Failed to serialize client storage")?;
        fs::write(&self.path, json).wrap_err_with(|| {
            format!("Failed to write client storage {}", self.path.display())
        })
    }
}

impl ClientStorage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.items.insert(key.to_owned(), value.to_owned());
        self.flush()
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        if self.items.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    items: BTreeMap<String, String>,
}

impl ClientStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.items.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn file_storage__set_item__survives_reopen() {
        // given
        let dir = TempDir::new("storage").unwrap();
        let path = dir.path().join("nested").join(STORAGE_FILE);
        let mut storage = FileStorage::open(&path).unwrap();

        // when
        storage.set_item(CONNECTED_KEY, INJECTED_CONNECTOR).unwrap();

        // then
        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(
            reopened.get_item(CONNECTED_KEY).as_deref(),
            Some(INJECTED_CONNECTOR)
        );
    }

    #[test]
    fn file_storage__remove_item__survives_reopen() {
        // given
        let dir = TempDir::new("storage").unwrap();
        let path = dir.path().join(STORAGE_FILE);
        let mut storage = FileStorage::open(&path).unwrap();
        storage.set_item(CONNECTED_KEY, INJECTED_CONNECTOR).unwrap();
        storage.set_item("theme", "dark").unwrap();

        // when
        storage.remove_item(CONNECTED_KEY).unwrap();

        // then
        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get_item(CONNECTED_KEY), None);
        assert_eq!(reopened.get_item("theme").as_deref(), Some("dark"));
    }

    #[test]
    fn file_storage__missing_file__opens_empty_without_creating_it() {
        let dir = TempDir::new("storage").unwrap();
        let path = dir.path().join(STORAGE_FILE);

        let storage = FileStorage::open(&path).unwrap();

        assert_eq!(storage.get_item(CONNECTED_KEY), None);
        assert!(!path.exists());
    }

    #[test]
    fn file_storage__corrupt_file__is_an_error() {
        let dir = TempDir::new("storage").unwrap();
        let path = dir.path().join(STORAGE_FILE);
        fs::write(&path, b"connected=inject").unwrap();

        assert!(FileStorage::open(&path).is_err());
    }
}
