use crate::domain_port::StoreError;

/// Named string-to-string maps.
#[async_trait::async_trait]
pub trait KvStore: Send + Sync {
    async fn get_field(&self, map: &str, key: &str) -> Result<Option<String>, StoreError>;

    async fn set_field(&self, map: &str, key: &str, value: &str) -> Result<(), StoreError>;

    /// Deleting a missing key succeeds.
    async fn delete_field(&self, map: &str, key: &str) -> Result<(), StoreError>;
}
