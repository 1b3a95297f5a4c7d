//! Local tile storage collaborator.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use dashmap::DashMap;
use thiserror::Error;

use super::coord::TileCoordinate;
use crate::BoxFuture;

/// Errors reported by a tile store.
#[derive(Debug, Error)]
pub enum TileStoreError {
    /// I/O error reading a tile.
    #[error("Failed to read tile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Source of locally stored tiles.
pub trait TileStore: Send + Sync {
    /// Return the raw tile bytes, or `None` if the tile is not stored locally.
    fn lookup(&self, coord: TileCoordinate) -> BoxFuture<'_, Result<Option<Bytes>, TileStoreError>>;
}

/// Tiles stored as files under `{root}/{z}/{x}/{y}.{extension}`.
#[derive(Debug, Clone)]
pub struct DirectoryTileStore {
    root: PathBuf,
    extension: String,
}

impl DirectoryTileStore {
    /// Create a store rooted at `root` for files with `extension` (no dot).
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `coord`.
    pub fn tile_path(&self, coord: TileCoordinate) -> PathBuf {
        self.root
            .join(coord.zoom().to_string())
            .join(coord.column().to_string())
            .join(format!("{}.{}", coord.row(), self.extension))
    }
}

impl TileStore for DirectoryTileStore {
    fn lookup(
        &self,
        coord: TileCoordinate,
    ) -> BoxFuture<'_, Result<Option<Bytes>, TileStoreError>> {
        let path = self.tile_path(coord);
        Box::pin(async move {
            match tokio::fs::read(&path).await {
                Ok(data) => Ok(Some(Bytes::from(data))),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(source) => Err(TileStoreError::Io { path, source }),
            }
        })
    }
}

/// In-memory tile store.
#[derive(Debug, Default)]
pub struct MemoryTileStore {
    tiles: DashMap<TileCoordinate, Bytes>,
}

impl MemoryTileStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a tile.
    pub fn insert(&self, coord: TileCoordinate, data: impl Into<Bytes>) {
        self.tiles.insert(coord, data.into());
    }

    /// Number of stored tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl TileStore for MemoryTileStore {
    fn lookup(
        &self,
        coord: TileCoordinate,
    ) -> BoxFuture<'_, Result<Option<Bytes>, TileStoreError>> {
        Box::pin(async move { Ok(self.tiles.get(&coord).map(|t| t.value().clone())) })
    }
}
