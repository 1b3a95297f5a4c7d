//! Application bootstrap and consumer-facing operations.

use std::sync::Arc;

use reqwest::header::HeaderMap;
use tracing::info;

use super::config::AppConfig;
use super::error::AppError;
use crate::asset::{
    AssetCacheStats, AssetDescriptor, AssetDescriptorProjector, AssetTypeCache, AssetTypeError,
    AssetTypeList, AssetTypeRecord, AssetTypeStore, MemoryAssetTypeStore,
};
use crate::tile::{
    DirectoryTileStore, MemoryTileStore, ProxiedResponse, TileError, TileGateway, TileOutcome,
    TileResponse, TileStore, UpstreamClient,
};

/// The asset-type cache and the tile gateway behind one handle.
pub struct AssetGate {
    asset_types: Arc<AssetTypeCache>,
    projector: AssetDescriptorProjector,
    gateway: TileGateway,
}

impl AssetGate {
    /// Start with stores built from `config`.
    ///
    /// The asset-type store is seeded from `config.seed_file` when set and
    /// starts empty otherwise. Local tiles come from `config.tiles.directory`
    /// when set.
    ///
    /// # Errors
    ///
    /// Returns an error if the seed file cannot be loaded or the HTTP client
    /// cannot be created.
    pub fn start(config: AppConfig) -> Result<Self, AppError> {
        let asset_store: Arc<dyn AssetTypeStore> = match &config.seed_file {
            Some(path) => Arc::new(MemoryAssetTypeStore::from_json_file(path)?),
            None => Arc::new(MemoryAssetTypeStore::new()),
        };

        let tile_store: Arc<dyn TileStore> = match &config.tiles.directory {
            Some(directory) => Arc::new(DirectoryTileStore::new(
                directory.clone(),
                config.tiles.extension.clone(),
            )),
            None => Arc::new(MemoryTileStore::new()),
        };

        Self::with_stores(config, asset_store, tile_store)
    }

    /// Start with caller-supplied stores and the default HTTP client.
    pub fn with_stores(
        config: AppConfig,
        asset_store: Arc<dyn AssetTypeStore>,
        tile_store: Arc<dyn TileStore>,
    ) -> Result<Self, AppError> {
        let asset_types = Arc::new(AssetTypeCache::new(asset_store, &config.cache));
        let gateway = TileGateway::new(tile_store, config.gateway.clone())?;
        Ok(Self::assemble(&config, asset_types, gateway))
    }

    /// Start with every collaborator supplied by the caller.
    pub fn with_components(
        config: AppConfig,
        asset_store: Arc<dyn AssetTypeStore>,
        tile_store: Arc<dyn TileStore>,
        upstream: Arc<dyn UpstreamClient>,
    ) -> Self {
        let asset_types = Arc::new(AssetTypeCache::new(asset_store, &config.cache));
        let gateway = TileGateway::with_client(tile_store, upstream, config.gateway.clone());
        Self::assemble(&config, asset_types, gateway)
    }

    fn assemble(
        config: &AppConfig,
        asset_types: Arc<AssetTypeCache>,
        gateway: TileGateway,
    ) -> Self {
        info!(
            version = crate::VERSION,
            max_entries = config.cache.max_entries,
            ttl = ?config.cache.time_to_live,
            upstream = gateway.has_upstream(),
            "AssetGate started"
        );

        Self {
            projector: AssetDescriptorProjector::new(Arc::clone(&asset_types)),
            asset_types,
            gateway,
        }
    }

    /// Look up one asset type. `Ok(None)` if it does not exist.
    pub async fn get_asset_type(
        &self,
        id: &str,
    ) -> Result<Option<Arc<AssetTypeRecord>>, AssetTypeError> {
        self.asset_types.get(id).await
    }

    /// All asset types, ordered by identifier.
    pub async fn get_all_asset_types(&self) -> Result<AssetTypeList, AssetTypeError> {
        self.asset_types.get_all().await
    }

    /// Delete one asset type. Returns whether it existed.
    pub async fn delete_asset_type(&self, id: &str) -> Result<bool, AssetTypeError> {
        self.asset_types.delete(id).await
    }

    /// Descriptors for every asset type. Never fails; empty when the store
    /// is unavailable.
    pub async fn get_asset_descriptors(&self) -> Vec<AssetDescriptor> {
        self.projector.project().await
    }

    /// Serve a tile from the local store only.
    pub async fn get_tile(
        &self,
        zoom: u32,
        column: u32,
        row: u32,
    ) -> Result<TileOutcome, TileError> {
        self.gateway.get_tile(zoom, column, row).await
    }

    /// Relay a tile from the upstream.
    pub async fn get_external_tile(
        &self,
        zoom: u32,
        column: u32,
        row: u32,
        headers: &HeaderMap,
    ) -> Result<ProxiedResponse, TileError> {
        self.gateway
            .get_external_tile(zoom, column, row, headers)
            .await
    }

    /// Serve a tile locally, falling back to the upstream.
    pub async fn resolve_tile(
        &self,
        zoom: u32,
        column: u32,
        row: u32,
        headers: &HeaderMap,
    ) -> Result<TileResponse, TileError> {
        self.gateway.resolve(zoom, column, row, headers).await
    }

    /// Asset-type cache statistics.
    pub fn cache_stats(&self) -> AssetCacheStats {
        self.asset_types.stats()
    }

    /// The asset-type cache.
    pub fn asset_types(&self) -> Arc<AssetTypeCache> {
        Arc::clone(&self.asset_types)
    }

    /// The tile gateway.
    pub fn gateway(&self) -> &TileGateway {
        &self.gateway
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bytes::Bytes;
    use reqwest::StatusCode;
    use tempfile::tempdir;

    use crate::tile::upstream_mock::MockUpstreamClient;

    const SEED: &str = r##"[
        {"id": "pump", "descriptor": {"name": "Pump", "colour": "#0088ff"}},
        {"id": "valve", "descriptor": {"name": "Valve", "icon": "valve"}}
    ]"##;

    fn seeded_store() -> Arc<MemoryAssetTypeStore> {
        Arc::new(MemoryAssetTypeStore::with_records([
            AssetTypeRecord::new("pump", AssetDescriptor::new("Pump")),
            AssetTypeRecord::new("valve", AssetDescriptor::new("Valve")),
        ]))
    }

    #[tokio::test]
    async fn test_start_from_seed_file_and_tile_directory() {
        let dir = tempdir().unwrap();
        let seed = dir.path().join("types.json");
        std::fs::write(&seed, SEED).unwrap();

        let tiles = dir.path().join("tiles");
        std::fs::create_dir_all(tiles.join("3").join("2")).unwrap();
        std::fs::write(tiles.join("3").join("2").join("1.pbf"), b"tile").unwrap();

        let gate = AssetGate::start(
            AppConfig::default()
                .with_seed_file(&seed)
                .with_tile_directory(&tiles),
        )
        .unwrap();

        let pump = gate.get_asset_type("pump").await.unwrap().unwrap();
        assert_eq!(pump.descriptor().colour.as_deref(), Some("#0088ff"));
        assert_eq!(gate.get_all_asset_types().await.unwrap().len(), 2);

        assert_eq!(
            gate.get_tile(3, 2, 1).await.unwrap(),
            TileOutcome::Local(Bytes::from_static(b"tile"))
        );
        assert_eq!(gate.get_tile(3, 2, 0).await.unwrap(), TileOutcome::NoContent);
    }

    #[test]
    fn test_start_with_bad_seed_file() {
        let dir = tempdir().unwrap();
        let seed = dir.path().join("types.json");
        std::fs::write(&seed, "{not json").unwrap();

        let result = AssetGate::start(AppConfig::default().with_seed_file(&seed));
        assert!(matches!(result, Err(AppError::Store(_))));
    }

    #[tokio::test]
    async fn test_delete_updates_descriptors() {
        let gate = AssetGate::with_components(
            AppConfig::default(),
            seeded_store(),
            Arc::new(MemoryTileStore::new()),
            Arc::new(MockUpstreamClient::failing("unused")),
        );

        let names: Vec<String> = gate
            .get_asset_descriptors()
            .await
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Pump", "Valve"]);

        assert!(gate.delete_asset_type("pump").await.unwrap());
        assert!(gate.get_asset_type("pump").await.unwrap().is_none());

        let descriptors = gate.get_asset_descriptors().await;
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].name, "Valve");
    }

    #[tokio::test]
    async fn test_external_tile_through_facade() {
        let gate = AssetGate::with_components(
            AppConfig::default().with_upstream_url("http://tiles.example/{z}/{x}/{y}.pbf"),
            seeded_store(),
            Arc::new(MemoryTileStore::new()),
            Arc::new(MockUpstreamClient::ok(
                StatusCode::OK,
                HeaderMap::new(),
                b"\x1a\x02\x08\x01",
            )),
        );

        let response = gate
            .get_external_tile(5, 10, 12, &HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.into_bytes().await.unwrap(),
            Bytes::from_static(b"\x1a\x02\x08\x01")
        );

        assert!(matches!(
            gate.resolve_tile(5, 10, 12, &HeaderMap::new()).await.unwrap(),
            TileResponse::Remote(_)
        ));
    }

    #[tokio::test]
    async fn test_cache_stats_reflect_usage() {
        let gate = AssetGate::with_components(
            AppConfig::default(),
            seeded_store(),
            Arc::new(MemoryTileStore::new()),
            Arc::new(MockUpstreamClient::failing("unused")),
        );

        gate.get_asset_type("pump").await.unwrap();
        gate.get_asset_type("pump").await.unwrap();

        let stats = gate.cache_stats();
        assert_eq!(stats.records.loads, 1);
        assert_eq!(stats.records.hits, 1);
    }
}
