pub mod defaults;
pub mod file;
pub mod gateway;
pub mod memory;
pub mod postgres;

/// Key of the local override. Carries the schema tag so a future version gets its own slot.
pub const STORAGE_KEY: &str = "assetViews:v1";

/// The local key-value store holding the override document.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Replaces any previous value wholesale.
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> anyhow::Result<()>;
}
