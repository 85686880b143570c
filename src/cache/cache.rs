use std::{fmt::Debug, future::Future};

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{CacheError, Error},
    CATALOG_CACHE_BIND,
};

// Caching - keys

#[derive(Clone, Debug)]
pub struct CacheKey<T: ToString> {
    value: T,
    r#type: CacheKeyType,
}

impl<T: ToString> CacheKey<T> {
    pub fn from(r#type: CacheKeyType, key: T) -> Self {
        Self { value: key, r#type }
    }
}

impl<T: ToString> std::fmt::Display for CacheKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.r#type {
            CacheKeyType::Ingredients => write!(f, "ingredients-{}", self.value.to_string()),
            CacheKeyType::Tags => write!(f, "tags-{}", self.value.to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheKeyType {
    Ingredients,
    Tags,
}

impl CacheKeyType {
    pub fn new<T: ToString>(self, key: T) -> CacheKey<T> {
        CacheKey::from(self, key)
    }
}

// Cache - wrappers

/// Current catalog bind. Values stored under an older bind are stale.
async fn catalog_bind(cache: &mut MultiplexedConnection) -> Result<Option<String>, Error> {
    get_cache_value::<&str, String>(CATALOG_CACHE_BIND, cache).await
}

/// A cached value together with the catalog bind it was stored under.
/// Stored in Redis as a JSON string.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RedisValue<T> {
    pub value: T,
    bind: Option<String>,
}

impl<T: Serialize + DeserializeOwned + Send + Sync> RedisValue<T> {
    async fn new(value: T, cache: &mut MultiplexedConnection) -> Result<Self, Error> {
        let bind = catalog_bind(cache).await?;

        Ok(Self { value, bind })
    }

    fn is_current(&self, bind: &Option<String>) -> bool {
        &self.bind == bind
    }

    async fn read<K: ToString>(key: &CacheKey<K>, cache: &mut MultiplexedConnection) -> Option<Self> {
        let raw = match get_cache_value::<String, String>(key.to_string(), cache).await {
            Ok(raw) => raw?,
            Err(e) => {
                log::error!("> Failed to read cached value {key}: {e}");
                return None;
            }
        };

        match serde_json::from_str::<Self>(&raw) {
            Ok(value) => Some(value),
            Err(_) => {
                let mut c = cache.clone();
                let k = key.to_string();
                tokio::spawn(async move {
                    log::error!("> Failed to deserialize cached value. Deleting {}", &k);
                    if let Err(e) = delete_cache_value(k, &mut c).await {
                        log::error!("> Failed to delete cached value! {e}");
                    }
                });
                None
            }
        }
    }

    /// Returns the cached value under `key` while its bind is current,
    /// otherwise runs `callback` and stores the result.
    pub async fn get_or<F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<RedisValue<T>, Error>
    where
        K: ToString,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let value = match Self::read(&key, cache).await {
            Some(value) => {
                log::trace!("> Found {key}");
                match value.is_current(&catalog_bind(cache).await?) {
                    true => Some(value),
                    false => {
                        log::trace!("> Invalidated {key}");
                        None
                    }
                }
            }
            None => None,
        };

        match value {
            Some(value) => Ok(value),
            None => {
                log::trace!("> Fetching {key}");
                let value = callback().await?;
                let value = RedisValue::new(value, cache).await?;

                let raw = serde_json::to_string(&value).map_err(CacheError::from)?;
                set_cache_value(key.to_string(), raw, cache).await?;

                Ok(value)
            }
        }
    }
}

/// Serves `callback` through the cache when one is configured. A failing
/// cache is logged and bypassed.
pub async fn cached_or<T, F, Fut, K>(
    key: CacheKey<K>,
    cache: Option<&MultiplexedConnection>,
    callback: F,
) -> Result<T, Error>
where
    T: Serialize + DeserializeOwned + Send + Sync,
    K: ToString,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let Some(cache) = cache else {
        return callback().await;
    };

    let mut cache = cache.clone();
    match RedisValue::get_or(key, &mut cache, &callback).await {
        Ok(cached) => Ok(cached.value),
        Err(Error::Cache(e)) => {
            log::error!("> Bypassing cache: {e}");
            callback().await
        }
        Err(e) => Err(e),
    }
}

/// Rotates the catalog bind so every catalog listing is refetched.
pub async fn invalidate_catalog_cache(cache: &mut MultiplexedConnection) -> Result<(), Error> {
    let bind = Uuid::new_v4().to_string();
    log::trace!("> Rotating catalog cache bind to {bind}");

    set_cache_value(CATALOG_CACHE_BIND, bind, cache).await
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    let _: () = cache.set(key, value).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    let _: () = cache.del(key).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue + Debug>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, Error> {
    let value: Option<V> = cache.get(key).await.map_err(CacheError::from)?;

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_type() {
        assert_eq!(CacheKeyType::Ingredients.new("fl").to_string(), "ingredients-fl");
        assert_eq!(CacheKeyType::Tags.new("*").to_string(), "tags-*");
    }

    #[test]
    fn values_from_an_older_bind_are_stale() {
        let value = RedisValue {
            value: vec![1, 2],
            bind: Some("a".to_owned()),
        };
        assert!(value.is_current(&Some("a".to_owned())));
        assert!(!value.is_current(&Some("b".to_owned())));
        assert!(!value.is_current(&None));
    }
}
