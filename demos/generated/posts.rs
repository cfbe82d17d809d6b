// Generated by sqlgen. DO NOT EDIT.
// Source: demos/queries/posts.sql

/// PostgreSQL enum `post_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostStatus {
    Draft,
    Published,
    Archived,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Archived => "archived",
        }
    }
}

/// Posts for an author feed; @author_id may be NULL to list everything.
pub const LIST_POSTS_BY_AUTHOR: &str = r#"SELECT p.id, p.title, p.status, p.published_at
FROM posts p
WHERE ($3::bigint IS NULL OR p.author_id = $3)
ORDER BY p.published_at DESC
LIMIT $1 OFFSET $2"#;

#[derive(Debug, Clone)]
pub struct ListPostsByAuthorParams {
    pub limit: i64,
    pub offset: i64,
    pub author_id: i64,
}

#[derive(Debug, Clone)]
pub struct ListPostsByAuthorRow {
    pub id: i64,
    pub title: String,
    pub status: PostStatus,
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,
}

pub const COUNT_POSTS: &str = "SELECT COUNT(*) AS total! FROM posts";

#[derive(Debug, Clone)]
pub struct CountPostsRow {
    pub total: i64,
}

pub const LOCK_POST: &str = "UPDATE posts SET locked_until_at = $2 WHERE id = $1";

#[derive(Debug, Clone)]
pub struct LockPostParams {
    pub id: i64,
    pub locked_until_at: chrono::DateTime<chrono::Utc>,
}
