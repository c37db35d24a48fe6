use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tokio::sync::mpsc;

use crate::storage::{Ingest, NewPost, Post, PostQuery};

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Every connection to an in-memory database gets its own empty copy.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                pub_time TEXT NOT NULL,
                link TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Feeds without links cannot be deduplicated, so only non-empty
        // links are held unique.
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_posts_link
            ON posts(link) WHERE link <> ''
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_posts_pub_time
            ON posts(pub_time DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn posts(&self, query: &PostQuery) -> anyhow::Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, title, content, pub_time, link FROM posts
            WHERE (? IS NULL OR instr(lower(title), lower(?)) > 0)
            ORDER BY pub_time DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(query.search.as_deref())
        .bind(query.search.as_deref())
        .bind(query.limit.unwrap_or(-1))
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    pub async fn count(&self, query: &PostQuery) -> anyhow::Result<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM posts
            WHERE (? IS NULL OR instr(lower(title), lower(?)) > 0)
            "#,
        )
        .bind(query.search.as_deref())
        .bind(query.search.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }

    pub async fn post_by_id(&self, id: i64) -> anyhow::Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            "SELECT id, title, content, pub_time, link FROM posts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }
}

#[async_trait]
impl Ingest for Database {
    async fn add_posts(&self, mut posts: mpsc::Receiver<NewPost>) -> anyhow::Result<usize> {
        let mut batch = Vec::new();
        while let Some(post) = posts.recv().await {
            batch.push(post);
        }

        let mut tx = self.pool.begin().await?;
        let mut added = 0;
        for post in &batch {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO posts (title, content, pub_time, link)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(&post.title)
            .bind(&post.content)
            .bind(post.pub_time)
            .bind(&post.link)
            .execute(&mut *tx)
            .await?;
            added += result.rows_affected() as usize;
        }
        tx.commit().await?;

        Ok(added)
    }
}
