use crate::domain_port::*;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

/// Each map is a Redis hash named `<prefix>:<map>`.
pub struct RedisKvStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisKvStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisKvStore {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, map: &str) -> String {
        if self.prefix.is_empty() {
            map.to_owned()
        } else {
            format!("{}:{}", self.prefix, map)
        }
    }
}

#[async_trait::async_trait]
impl KvStore for RedisKvStore {
    async fn get_field(&self, map: &str, key: &str) -> Result<Option<String>, StoreError> {
        let hash = self.key(map);
        let mut conn = self.conn.clone();
        let value: Option<String> = conn
            .hget(&hash, key)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(value)
    }

    async fn set_field(&self, map: &str, key: &str, value: &str) -> Result<(), StoreError> {
        let hash = self.key(map);
        let mut conn = self.conn.clone();
        let _: () = conn
            .hset(&hash, key, value)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }

    async fn delete_field(&self, map: &str, key: &str) -> Result<(), StoreError> {
        let hash = self.key(map);
        let mut conn = self.conn.clone();
        let _: () = conn
            .hdel(&hash, key)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }
}
