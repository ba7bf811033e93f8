//! Filesystem-backed asset loader.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use warden_core::{AssetLoader, LoadError};

/// Serves key material from files under a fixed root directory.
#[derive(Debug, Clone)]
pub struct StaticAssetLoader {
    root: PathBuf,
}

impl StaticAssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, uri: &str) -> Result<PathBuf, LoadError> {
        let relative = Path::new(uri);
        let mut resolved = self.root.clone();
        let mut pushed = false;
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    pushed = true;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(LoadError::OutsideRoot(uri.to_string()));
                }
            }
        }
        if !pushed {
            return Err(LoadError::NotFound(uri.to_string()));
        }
        Ok(resolved)
    }
}

impl AssetLoader for StaticAssetLoader {
    fn load(&self, uri: &str) -> Result<Vec<u8>, LoadError> {
        let path = self.resolve(uri)?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LoadError::NotFound(uri.to_string()),
            _ => LoadError::Io {
                uri: uri.to_string(),
                message: e.to_string(),
            },
        })
    }
}
