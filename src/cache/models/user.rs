use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 用户缓存模型(用于缓存和API交互)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserView {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: String,
    pub intro: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub status: String,
    pub avatar_link: Option<String>,
    pub background_link: Option<String>,
}
