use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

use super::traits::{check_quota, KeyValueStore};
use crate::utils::StorageError;

/// Directory-backed store: one file per key
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    quota: Option<usize>,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `root`
    pub fn new(root: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&root)?;
        Ok(Self { root, quota: None })
    }

    /// Open a store in the platform data directory
    /// (~/.local/share/pams on Linux, ~/Library/Application Support/pams on macOS)
    pub fn open_default() -> Result<Self, StorageError> {
        Self::new(default_data_dir()?)
    }

    pub fn with_quota(mut self, quota: Option<usize>) -> Self {
        self.quota = quota;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_key(key)))
    }

    fn bytes_used_except(&self, skip: &Path) -> Result<usize, StorageError> {
        let mut total = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path == skip || path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            total += entry.metadata()?.len() as usize;
        }
        Ok(total)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if self.quota.is_some() {
            check_quota(self.quota, self.bytes_used_except(&path)?, value.len())?;
        }

        // Write-then-rename so readers never see a torn value
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Get the default data directory
pub fn default_data_dir() -> Result<PathBuf, StorageError> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "pams") {
        Ok(proj_dirs.data_dir().to_path_buf())
    } else {
        // Fallback to ~/.local/share/pams
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| {
                StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Could not determine home directory",
                ))
            })?;
        Ok(PathBuf::from(home).join(".local").join("share").join("pams"))
    }
}

fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}
