use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 帖子缓存模型(用于缓存和API交互)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostView {
    pub id: i64,
    pub title: String,
    pub user_id: i64,
    pub club_id: Option<i64>,
    pub content: String,
    pub brief: Option<String>,
    pub status: String,
    pub is_essence: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub view_count: i32,
    pub like_count: i32,
    pub comment_count: i32,
}
