use crate::domain_port::*;
use dashmap::DashMap;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    maps: DashMap<String, BTreeMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_len(&self, map: &str) -> usize {
        self.maps.get(map).map(|m| m.len()).unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl KvStore for MemoryKvStore {
    async fn get_field(&self, map: &str, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.maps.get(map).and_then(|m| m.get(key).cloned()))
    }

    async fn set_field(&self, map: &str, key: &str, value: &str) -> Result<(), StoreError> {
        self.maps
            .entry(map.to_owned())
            .or_default()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn delete_field(&self, map: &str, key: &str) -> Result<(), StoreError> {
        if let Some(mut m) = self.maps.get_mut(map) {
            m.remove(key);
        }
        Ok(())
    }
}
