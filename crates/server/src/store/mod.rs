//! JSON document stores for orders and carts.
//!
//! Each collection lives in one file read and written whole. There is no
//! partial update: every operation loads the document, mutates it in memory,
//! and writes it back, with a `tokio::sync::Mutex` serializing the
//! read-modify-write so concurrent requests cannot lose appends. Writes go
//! through a temp file and rename so a crash never leaves a half-written
//! document behind.

pub mod carts;
pub mod orders;

use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

pub use carts::{CartStore, FileCartStore, MemoryCartStore};
pub use orders::{FileOrderStore, OrderStore, estimate_delivery, generate_order_id};

/// Errors from the document stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Writing the document to disk failed.
    #[error("Impossibile salvare {entity}")]
    Save {
        entity: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Reading an existing document failed. A missing file is not an
    /// error; it reads as an empty collection.
    #[error("Failed to read document at {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document on disk is not valid JSON. Surfaced instead of being
    /// replaced: overwriting it would destroy every stored record.
    #[error("Corrupt document at {}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read a whole document, treating a missing file as the empty default.
async fn read_document<T>(path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            path: path.to_path_buf(),
            source: e,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(StoreError::Read {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Write a whole document atomically (temp file + rename).
async fn write_document<T>(path: &Path, document: &T, entity: &'static str) -> Result<(), StoreError>
where
    T: Serialize,
{
    let save_err = |source| StoreError::Save { entity, source };

    let json = serde_json::to_vec_pretty(document)
        .map_err(|e| save_err(std::io::Error::other(e)))?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await.map_err(save_err)?;
    }

    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, &json).await.map_err(save_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(save_err)?;
    Ok(())
}
