use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use tokio::sync::mpsc;

/// A post produced from a feed item, before storage has assigned it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub pub_time: DateTime<Utc>,
    pub link: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub pub_time: DateTime<Utc>,
    pub link: String,
}

/// Filter and window for reading posts back.
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    /// Maximum number of posts, `None` for all of them
    pub limit: Option<i64>,
    pub offset: i64,
    /// Case-insensitive substring match on the title
    pub search: Option<String>,
}

/// Durable sink for normalized posts.
///
/// Implementations must accept being called concurrently by every poller and
/// must treat a post whose link is already stored as a no-op, not an error.
/// Callers cancel an ingest by dropping the future.
#[async_trait]
pub trait Ingest: Send + Sync {
    /// Drain `posts` and store them, returning how many were new.
    async fn add_posts(&self, posts: mpsc::Receiver<NewPost>) -> anyhow::Result<usize>;
}
