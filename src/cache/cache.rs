use std::{fmt::Debug, future::Future};

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{constants::RECIPE_CACHE_KEY, error::CacheError};

// Caching - keys

#[derive(Serialize, Clone, Debug)]
pub struct CacheKey<T: ToString + Serialize> {
    _value: T,
    _type: CacheKeyType,
}

impl<T: ToString + Serialize> CacheKey<T> {
    pub fn from(r#type: CacheKeyType, key: T) -> Self {
        Self {
            _value: key,
            _type: r#type,
        }
    }

    pub fn to_string(&self) -> String {
        self.into()
    }
}

impl<T: ToString + Serialize> Into<String> for &CacheKey<T> {
    fn into(self) -> String {
        match self._type {
            CacheKeyType::Recipe => format!("recipe-{}", self._value.to_string()),
            CacheKeyType::ShortLink => format!("short-link-{}", self._value.to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub enum CacheKeyType {
    Recipe,
    ShortLink,
}

impl CacheKeyType {
    pub fn new<T: ToString + Serialize>(self, key: T) -> CacheKey<T> {
        CacheKey::from(self, key)
    }
}

// Cache - wrappers

/// Every cached value is bound to the current recipe cache generation.
async fn recipe_cache_bind(
    cache: &mut MultiplexedConnection,
) -> Result<Option<String>, potion::Error> {
    get_cache_value::<&str, String>(RECIPE_CACHE_KEY, cache).await
}

/// A cached value together with the cache generation it was stored under.
#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone, Debug)]
pub struct RedisValue {
    pub value: serde_json::Value,
    _bind: Option<String>,
}

impl RedisValue {
    async fn new<T: Serialize>(
        value: &T,
        cache: &mut MultiplexedConnection,
    ) -> Result<Self, potion::Error> {
        let bind = recipe_cache_bind(cache).await?;
        let value = serde_json::to_value(value)
            .map_err(|e| CacheError::new(format!("Failed to serialize cached value: {e}")))?;

        Ok(Self { value, _bind: bind })
    }

    async fn validate(&self, cache: &mut MultiplexedConnection) -> Result<bool, potion::Error> {
        Ok(self._bind == recipe_cache_bind(cache).await?)
    }

    /// Returns the cached value for `key`, or runs `callback` and caches its result.
    /// `None` results are not cached.
    pub async fn get_or_optional<T, F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<Option<T>, potion::Error>
    where
        T: Serialize + DeserializeOwned,
        K: ToString + Serialize + Clone + Send + Sync + Debug,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, potion::Error>>,
    {
        let value = get_cache_value::<String, RedisValue>((&key).into(), cache)
            .await
            .unwrap_or_else(|_| {
                let mut c = cache.clone();
                let k = key.to_string();
                tokio::spawn(async move {
                    log::error!("> Failed to deserialize cached value. Deleting {}", &k);
                    if let Err(e) = delete_cache_value(k, &mut c).await {
                        log::error!("> Failed to delete cached value! {:?}", e.info);
                    }
                });
                None
            });
        // * Cannot use .map(|| {...}) due to async closures
        let value = match value {
            Some(value) => {
                log::trace!("> Found {:?}", key.to_string());
                match value.validate(cache).await? {
                    true => serde_json::from_value::<T>(value.value).ok(),
                    false => {
                        log::trace!("> Invalidated {}", key.to_string());
                        None
                    }
                }
            }
            None => None,
        };

        match value {
            Some(value) => Ok(Some(value)),
            None => {
                log::trace!("> Fetching {:?}", key.to_string());
                match callback().await? {
                    Some(value) => {
                        let cached = RedisValue::new(&value, cache).await?;

                        if let Err(e) =
                            set_cache_value::<String, RedisValue>((&key).into(), cached, cache)
                                .await
                        {
                            log::error!("{:?}", e.info);
                        }

                        Ok(Some(value))
                    }
                    None => Ok(None),
                }
            }
        }
    }
}

impl RedisValue {
    /// Like `get_or_optional`, but runs `callback` directly when no cache is configured.
    pub async fn get_or_fetch<T, F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut Option<MultiplexedConnection>,
        callback: F,
    ) -> Result<Option<T>, potion::Error>
    where
        T: Serialize + DeserializeOwned,
        K: ToString + Serialize + Clone + Send + Sync + Debug,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, potion::Error>>,
    {
        match cache {
            Some(cache) => Self::get_or_optional(key, cache, callback).await,
            None => callback().await,
        }
    }
}

/// Drops every recipe-bound value. Failures are logged; the database write already happened.
pub async fn expire_recipe_cache(cache: &mut Option<MultiplexedConnection>) {
    if let Some(cache) = cache {
        if let Err(e) = invalidate_recipe_cache(cache).await {
            log::error!("> Failed to invalidate recipe cache: {:?}", e.info);
        }
    }
}

/// Starts a new recipe cache generation; every value bound to the old one becomes stale.
pub async fn invalidate_recipe_cache(cache: &mut MultiplexedConnection) -> Result<(), potion::Error> {
    let generation = uuid::Uuid::new_v4().to_string();
    log::trace!("> Recipe cache generation {generation}");
    set_cache_value(RECIPE_CACHE_KEY, generation, cache).await
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), potion::Error> {
    let _: () = cache.set(key, value).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), potion::Error> {
    let _: () = cache.del(key).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, potion::Error> {
    let value: Option<V> = cache.get(key).await.map_err(CacheError::from)?;

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        let recipe = CacheKeyType::Recipe.new(12);
        let link = CacheKeyType::ShortLink.new(String::from("aB3dE"));

        assert_eq!(recipe.to_string(), "recipe-12");
        assert_eq!(link.to_string(), "short-link-aB3dE");
    }
}
