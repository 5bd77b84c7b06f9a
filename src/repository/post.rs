use async_trait::async_trait;
use sqlx::PgPool;

use super::RecordSource;
use crate::cache::models::PostView;

/// 帖子存储库实现
#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordSource<PostView> for PgPostRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<PostView>, sqlx::Error> {
        tracing::debug!("Loading post {} from database", id);

        sqlx::query_as::<_, PostView>(
            r#"
            SELECT
                id, title, user_id, club_id, content, brief, status, is_essence,
                created_at, updated_at, view_count, like_count, comment_count
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}
