//! Redis-backed reference image store
//!
//! Each user owns an ordered list of reference image URLs plus a small
//! metadata hash. The metadata key is what distinguishes "user was never
//! set up" from "user exists but has no references": Redis drops empty
//! lists, so list existence alone cannot carry that distinction.

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::AppendOutcome;

/// Reference store failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Used by non-Redis implementations (tests)
    #[error("{0}")]
    Other(String),
}

/// Read/append access to a user's stored reference image URLs.
///
/// `get_references` returns `None` when the user has no row at all, and
/// `Some(vec![])` when a row exists with an empty list; callers rely on
/// that distinction.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    async fn get_references(&self, user_id: &str) -> Result<Option<Vec<String>>, StoreError>;

    async fn append_references(
        &self,
        user_id: &str,
        urls: &[String],
    ) -> Result<AppendOutcome, StoreError>;
}

/// Redis implementation of [`ReferenceStore`]
pub struct RedisReferenceStore {
    conn: ConnectionManager,
}

fn refs_key(user_id: &str) -> String {
    format!("face:{}:refs", user_id)
}

fn meta_key(user_id: &str) -> String {
    format!("face:{}:meta", user_id)
}

impl RedisReferenceStore {
    /// Connect to Redis and return a store handle
    pub async fn new(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        info!("Connected to Redis at {}", redis_url);

        Ok(Self { conn })
    }
}

#[async_trait]
impl ReferenceStore for RedisReferenceStore {
    async fn get_references(&self, user_id: &str) -> Result<Option<Vec<String>>, StoreError> {
        let mut conn = self.conn.clone();

        let (exists, refs): (bool, Vec<String>) = redis::pipe()
            .atomic()
            .exists(meta_key(user_id))
            .lrange(refs_key(user_id), 0, -1)
            .query_async(&mut conn)
            .await?;

        if !exists && refs.is_empty() {
            debug!("No reference row for user: {}", user_id);
            return Ok(None);
        }

        Ok(Some(refs))
    }

    async fn append_references(
        &self,
        user_id: &str,
        urls: &[String],
    ) -> Result<AppendOutcome, StoreError> {
        let mut conn = self.conn.clone();
        let now = Utc::now().to_rfc3339();

        // Single MULTI/EXEC block: the existence check, the list append and
        // the timestamp updates commit together, so concurrent appends for
        // the same user interleave without losing entries.
        let (existed, total): (bool, usize) = redis::pipe()
            .atomic()
            .exists(meta_key(user_id))
            .rpush(refs_key(user_id), urls)
            .hset_nx(meta_key(user_id), "created_at", &now)
            .ignore()
            .hset(meta_key(user_id), "updated_at", &now)
            .ignore()
            .query_async(&mut conn)
            .await?;

        info!(
            "Appended {} reference(s) for user {} (created: {}, total: {})",
            urls.len(),
            user_id,
            !existed,
            total
        );

        Ok(AppendOutcome {
            created: !existed,
            total_images: total,
        })
    }
}
