//! Loader contract for key material kept under the static-asset root.

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("asset '{0}' not found")]
    NotFound(String),

    #[error("asset uri '{0}' escapes the static-asset root")]
    OutsideRoot(String),

    #[error("failed to read asset '{uri}': {message}")]
    Io { uri: String, message: String },

    #[error("failed to decode asset '{uri}': {message}")]
    Decode { uri: String, message: String },
}

/// Reads raw bytes for a URI relative to a fixed static-asset root.
pub trait AssetLoader: Send + Sync {
    fn load(&self, uri: &str) -> Result<Vec<u8>, LoadError>;
}

impl<L> AssetLoader for std::sync::Arc<L>
where
    L: AssetLoader + ?Sized,
{
    fn load(&self, uri: &str) -> Result<Vec<u8>, LoadError> {
        (**self).load(uri)
    }
}

/// Load a JSON descriptor and deserialize it into `T`.
pub fn load_json<T: DeserializeOwned>(loader: &dyn AssetLoader, uri: &str) -> Result<T, LoadError> {
    let bytes = loader.load(uri)?;
    serde_json::from_slice(&bytes).map_err(|e| LoadError::Decode {
        uri: uri.to_string(),
        message: e.to_string(),
    })
}
