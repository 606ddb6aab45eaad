use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::provider::*;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::Arc;

pub struct Server {
    pub identity_service: Arc<dyn IdentityService>,
    pub strategy: DiscordStrategy,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let strategy = DiscordStrategy::try_new(&settings.sso.provider)?;

        let user_store: Arc<dyn UserStore>;
        let kv_store: Arc<dyn KvStore>;
        let mut pool: Option<Pool<MySql>> = None;

        match settings.store.backend.as_str() {
            "memory" => {
                user_store = Arc::new(MemoryUserStore::new());
                kv_store = Arc::new(MemoryKvStore::new());
            }
            "real" => {
                if settings.store.mysql_dsn.is_empty() {
                    return Err(ConfigError::MissingConfiguration("store.mysql_dsn").into());
                }
                if settings.store.redis_dsn.is_empty() {
                    return Err(ConfigError::MissingConfiguration("store.redis_dsn").into());
                }

                let redis_client = redis::Client::open(settings.store.redis_dsn.as_str())?;
                let redis_manager = redis_client.get_connection_manager().await?;
                let mysql_pool = Pool::<MySql>::connect(&settings.store.mysql_dsn).await?;

                user_store = Arc::new(MySqlUserStore::new(mysql_pool.clone()));
                kv_store = Arc::new(RedisKvStore::new(
                    redis_manager,
                    settings.store.redis_prefix.clone(),
                ));
                pool = Some(mysql_pool);
            }
            other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
        }

        let event_sink: Arc<dyn IdentityEventSink> = Arc::new(TracingEventSink::new());

        let identity_service: Arc<dyn IdentityService> = Arc::new(RealIdentityService::try_new(
            ResolverConfig {
                provider: DISCORD.to_string(),
                email_merge: settings.sso.email_merge,
            },
            user_store,
            kv_store,
            event_sink,
        )?);

        info!(
            backend = %settings.store.backend,
            email_merge = ?settings.sso.email_merge,
            "server started"
        );

        Ok(Self {
            identity_service,
            strategy,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
