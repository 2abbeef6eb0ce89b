use crate::config::Settings;
use crate::domain::asset_view::AssetViewDocument;
use crate::domain::contract::parse_document;
use crate::error::ViewError;
use crate::storage::defaults::{self, DefaultDatasetSource};
use crate::storage::file::FileStore;
use crate::storage::postgres::PgStore;
use crate::storage::{KeyValueStore, STORAGE_KEY};
use serde_json::Value;
use std::sync::Arc;

/// Arbitrates between the bundled default dataset and the local override.
#[derive(Clone)]
pub struct PersistenceGateway {
    store: Arc<dyn KeyValueStore>,
    defaults: Arc<dyn DefaultDatasetSource>,
    key: String,
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn KeyValueStore>, defaults: Arc<dyn DefaultDatasetSource>) -> Self {
        Self {
            store,
            defaults,
            key: STORAGE_KEY.to_string(),
        }
    }

    /// Postgres when `DATABASE_URL` is set, otherwise a file store under the configured dir.
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let store: Arc<dyn KeyValueStore> = match settings.database_url.as_deref() {
            Some(url) => Arc::new(PgStore::connect(url).await?),
            None => Arc::new(FileStore::new(settings.store_dir.clone())),
        };
        let defaults = defaults::from_settings(settings)?;

        tracing::info!(
            store = store.backend_name(),
            defaults = defaults.source_name(),
            "persistence gateway configured"
        );
        Ok(Self::new(store, defaults))
    }

    /// Fetch, parse and validate the default dataset. Every failure collapses to `Load`.
    pub async fn load_default(&self) -> Result<AssetViewDocument, ViewError> {
        let text = self.defaults.fetch().await.map_err(|e| {
            tracing::error!(source = self.defaults.source_name(), error = %e, "default dataset fetch failed");
            ViewError::Load(format!("{e:#}"))
        })?;

        parse_document(&text).map_err(|e| {
            tracing::error!(source = self.defaults.source_name(), error = %e, "default dataset rejected");
            ViewError::Load(e.to_string())
        })
    }

    /// The stored override as untrusted JSON.
    ///
    /// A missing key, unparseable text and an unreadable store all read as "no override".
    pub async fn load_local(&self) -> Option<Value> {
        let raw = match self.store.get(&self.key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "local override unreadable; ignoring");
                return None;
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "local override is not JSON; ignoring");
                None
            }
        }
    }

    /// The override if present and valid, otherwise the default dataset.
    pub async fn load_current(&self) -> Result<AssetViewDocument, ViewError> {
        if let Some(local) = self.load_local().await {
            match AssetViewDocument::from_untrusted(local) {
                Ok(doc) => {
                    tracing::debug!(key = %self.key, "using local override");
                    return Ok(doc);
                }
                Err(e) => {
                    tracing::warn!(key = %self.key, error = %e, "local override failed validation; using defaults");
                }
            }
        }
        self.load_default().await
    }

    /// Persists `doc` as the override. Callers validate first.
    pub async fn save(&self, doc: &AssetViewDocument) -> Result<(), ViewError> {
        let text =
            serde_json::to_string_pretty(doc).map_err(|e| ViewError::Storage(e.to_string()))?;
        self.store
            .set(&self.key, &text)
            .await
            .map_err(|e| ViewError::Storage(format!("{e:#}")))?;
        tracing::info!(key = %self.key, assets = doc.assets.len(), "local override saved");
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), ViewError> {
        self.store
            .remove(&self.key)
            .await
            .map_err(|e| ViewError::Storage(format!("{e:#}")))?;
        tracing::info!(key = %self.key, "local override cleared");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::asset_view::fixtures::{document, document_json};
    use crate::storage::defaults::BundledDefaults;
    use crate::storage::memory::MemoryStore;
    use serde_json::json;

    pub struct BrokenStore;

    #[async_trait::async_trait]
    impl KeyValueStore for BrokenStore {
        fn backend_name(&self) -> &'static str {
            "broken"
        }

        async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("disk on fire")
        }

        async fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("disk on fire")
        }

        async fn remove(&self, _key: &str) -> anyhow::Result<()> {
            anyhow::bail!("disk on fire")
        }
    }

    pub fn gateway_with(store: Arc<dyn KeyValueStore>) -> PersistenceGateway {
        let defaults = BundledDefaults::from_text(document_json().to_string());
        PersistenceGateway::new(store, Arc::new(defaults))
    }

    fn edited() -> AssetViewDocument {
        let mut doc = document();
        doc.assets[0].stance = "Edited".to_string();
        doc
    }

    #[tokio::test]
    async fn without_override_current_is_the_default() {
        let gateway = gateway_with(Arc::new(MemoryStore::new()));
        assert_eq!(gateway.load_local().await, None);
        assert_eq!(gateway.load_current().await.unwrap(), document());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let gateway = gateway_with(Arc::new(MemoryStore::new()));
        let doc = edited();
        gateway.save(&doc).await.unwrap();
        assert_eq!(gateway.load_current().await.unwrap(), doc);
    }

    #[tokio::test]
    async fn full_precision_floats_survive_save_and_load() {
        let gateway = gateway_with(Arc::new(MemoryStore::new()));
        let mut doc = document();
        doc.assets[0].key_levels.support[0].value = 1175.4621790330661;
        doc.assets[0].chart.points[0].value = 0.1 + 0.2;
        doc.assets[1].confidence = 33.333333333333336;
        gateway.save(&doc).await.unwrap();

        let loaded = gateway.load_current().await.unwrap();
        assert_eq!(
            loaded.assets[0].key_levels.support[0].value.to_bits(),
            1175.4621790330661_f64.to_bits()
        );
        assert_eq!(loaded, doc);
    }

    #[tokio::test]
    async fn invalid_override_falls_back_to_default() {
        let store = Arc::new(MemoryStore::new());
        let mut bad = document_json();
        bad["assets"][0]["direction"] = json!("Sideways");
        store.set(STORAGE_KEY, &bad.to_string()).await.unwrap();

        let gateway = gateway_with(store.clone());
        assert!(gateway.load_local().await.is_some());
        assert_eq!(gateway.load_current().await.unwrap(), document());

        store.set(STORAGE_KEY, "{ truncated").await.unwrap();
        assert_eq!(gateway.load_local().await, None);
        assert_eq!(gateway.load_current().await.unwrap(), document());
    }

    #[tokio::test]
    async fn clear_reverts_to_default() {
        let gateway = gateway_with(Arc::new(MemoryStore::new()));
        gateway.save(&edited()).await.unwrap();
        gateway.clear().await.unwrap();
        assert_eq!(gateway.load_current().await.unwrap(), document());
        gateway.clear().await.unwrap();
        assert_eq!(gateway.load_current().await.unwrap(), document());
    }

    #[tokio::test]
    async fn unreadable_store_reads_as_no_override() {
        let gateway = gateway_with(Arc::new(BrokenStore));
        assert_eq!(gateway.load_local().await, None);
        assert_eq!(gateway.load_current().await.unwrap(), document());
        assert!(matches!(gateway.save(&document()).await, Err(ViewError::Storage(_))));
    }

    #[tokio::test]
    async fn default_failures_collapse_to_load_error() {
        for text in ["not json", "{\"schemaVersion\": 1, \"assets\": []}"] {
            let gateway = PersistenceGateway::new(
                Arc::new(MemoryStore::new()),
                Arc::new(BundledDefaults::from_text(text)),
            );
            assert!(matches!(gateway.load_default().await, Err(ViewError::Load(_))));
            assert!(matches!(gateway.load_current().await, Err(ViewError::Load(_))));
        }
    }

    #[tokio::test]
    async fn stored_override_is_pretty_printed() {
        let store = Arc::new(MemoryStore::new());
        let gateway = gateway_with(store.clone());
        gateway.save(&document()).await.unwrap();
        let raw = store.get(STORAGE_KEY).await.unwrap().unwrap();
        assert!(raw.starts_with("{\n  \"schemaVersion\": 1"));
    }
}
