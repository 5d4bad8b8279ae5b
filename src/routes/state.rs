use std::{convert::Infallible, sync::Arc};

use redis::aio::MultiplexedConnection;
use sqlx::{Pool, Postgres};
use warp::Filter;

use crate::{constants::MAX_BODY_BYTES, jwt::SessionKey};

/// Shared per-process handles, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
    pub cache: Option<MultiplexedConnection>,
    pub session_key: SessionKey,
    pub base_url: Arc<str>,
}

impl AppState {
    pub fn new(
        pool: Pool<Postgres>,
        cache: Option<MultiplexedConnection>,
        session_key: SessionKey,
        base_url: &str,
    ) -> Self {
        Self {
            pool,
            cache,
            session_key,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        }
    }
}

pub fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

pub fn json_body<T>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}
