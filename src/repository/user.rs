use async_trait::async_trait;
use sqlx::PgPool;

use super::RecordSource;
use crate::cache::models::UserView;

/// 用户存储库实现，不读取密码等敏感列
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordSource<UserView> for PgUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserView>, sqlx::Error> {
        tracing::debug!("Loading user {} from database", id);

        sqlx::query_as::<_, UserView>(
            r#"
            SELECT
                id, email, name, role, intro, created_at, last_login_at,
                status, avatar_link, background_link
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}
