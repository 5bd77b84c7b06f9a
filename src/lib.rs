use std::sync::Arc;

use cache::keys::{POST_KEYS, USER_KEYS};
use cache::{
    CachePolicy, EntityCache, FailurePolicy, PostView, RateLimitRule, SessionStore,
    SlidingWindowRateLimiter, UserView,
};
use config::Config;
use repository::RecordSource;
use store::KeyValueStore;

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod repository;
pub mod result;
pub mod router;
pub mod routes;
pub mod store;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn KeyValueStore>,
    pub posts: Arc<EntityCache<PostView>>,
    pub users: Arc<EntityCache<UserView>>,
    pub auth: Arc<auth::AuthService>,
    pub limiter: Arc<SlidingWindowRateLimiter>,
}

impl AppState {
    /// 所有组件共享同一个存储连接
    pub fn new(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        post_source: Arc<dyn RecordSource<PostView>>,
        user_source: Arc<dyn RecordSource<UserView>>,
    ) -> Self {
        let policy = CachePolicy::from(&config);
        let sessions = Arc::new(SessionStore::new(Arc::clone(&store)));
        let auth = auth::AuthService::new(
            sessions,
            config.jwt_secret.clone(),
            config.jwt_expiration(),
        );
        let limiter = SlidingWindowRateLimiter::new(
            Arc::clone(&store),
            FailurePolicy::from_fail_open(config.rate_limit_fail_open),
        );

        Self {
            posts: Arc::new(EntityCache::new(
                Arc::clone(&store),
                POST_KEYS,
                policy,
                post_source,
            )),
            users: Arc::new(EntityCache::new(
                Arc::clone(&store),
                USER_KEYS,
                policy,
                user_source,
            )),
            auth: Arc::new(auth),
            limiter: Arc::new(limiter),
            config: Arc::new(config),
            store,
        }
    }

    /// 业务接口的默认限流规则
    pub fn rate_limit_rule(&self) -> RateLimitRule {
        RateLimitRule::new(
            self.config.rate_limit_window(),
            self.config.rate_limit_requests,
        )
    }
}
