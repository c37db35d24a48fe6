use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::debug;

use crate::db::Database;
use crate::storage::{Post, PostQuery};

const POSTS_PER_PAGE: i64 = 15;

pub struct AppState {
    pub db: Arc<Database>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/news", get(news))
        .route("/news/latest/:n", get(latest_news))
        .route("/news/id/:id", get(post_by_id))
        .route("/health", get(health))
        .with_state(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub pages: i64,
    pub current: i64,
    pub on_page: i64,
}

impl Pagination {
    /// Work out the page window for `total` posts.
    ///
    /// A page outside `1..=pages` is replaced by the first page.
    pub fn new(total: i64, requested: i64) -> Self {
        let pages = (total + POSTS_PER_PAGE - 1) / POSTS_PER_PAGE;
        let current = if (1..=pages).contains(&requested) {
            requested
        } else {
            1
        };
        let on_page = (total - (current - 1) * POSTS_PER_PAGE).clamp(0, POSTS_PER_PAGE);

        Self {
            pages,
            current,
            on_page,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.current - 1) * POSTS_PER_PAGE
    }
}

#[derive(Serialize)]
pub struct NewsPage {
    pub pagination: Pagination,
    pub posts: Vec<Post>,
}

/// Compact post shape for `/news/latest/:n`: ids are positions in the
/// response and times are unix seconds.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebPost {
    #[serde(rename = "ID")]
    pub id: usize,
    pub title: String,
    pub content: String,
    pub pub_time: i64,
    pub link: String,
}

impl WebPost {
    fn from_post(index: usize, post: Post) -> Self {
        Self {
            id: index,
            title: post.title,
            content: post.content,
            pub_time: post.pub_time.timestamp(),
            link: post.link,
        }
    }
}

// Custom error type
pub enum AppError {
    NotFound(&'static str),
    BadRequest(&'static str),
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::Internal(err) => {
                tracing::error!(error = %err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Error: {}", err),
                )
                    .into_response()
            }
        }
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError::Internal(err.into())
    }
}

#[derive(Deserialize)]
pub struct NewsQuery {
    pub page: Option<String>,
    pub s: Option<String>,
}

impl NewsQuery {
    fn page(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(1)
    }

    fn search(&self) -> Option<String> {
        self.s
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

// Route handlers
pub async fn news(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NewsQuery>,
) -> Result<Json<NewsPage>, AppError> {
    let mut filter = PostQuery {
        search: query.search(),
        ..Default::default()
    };

    let total = state.db.count(&filter).await?;
    if total == 0 {
        return Err(AppError::NotFound("posts not found"));
    }

    let pagination = Pagination::new(total, query.page());
    filter.limit = Some(POSTS_PER_PAGE);
    filter.offset = pagination.offset();

    let posts = state.db.posts(&filter).await?;
    debug!(posts = posts.len(), page = pagination.current, "news page served");

    Ok(Json(NewsPage { pagination, posts }))
}

pub async fn latest_news(
    State(state): State<Arc<AppState>>,
    Path(n): Path<i64>,
    Query(query): Query<NewsQuery>,
) -> Result<Json<Vec<WebPost>>, AppError> {
    if n < 1 {
        return Err(AppError::BadRequest("incorrect posts number"));
    }

    let filter = PostQuery {
        limit: Some(n),
        search: query.search(),
        ..Default::default()
    };
    let posts = state.db.posts(&filter).await?;
    if posts.is_empty() {
        return Err(AppError::NotFound("posts not found"));
    }

    let posts = posts
        .into_iter()
        .enumerate()
        .map(|(i, post)| WebPost::from_post(i, post))
        .collect();
    Ok(Json(posts))
}

pub async fn post_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Post>, AppError> {
    let post = state
        .db
        .post_by_id(id)
        .await?
        .ok_or(AppError::NotFound("post not found"))?;

    Ok(Json(post))
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
