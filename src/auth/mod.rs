//! 登录凭证签发与校验
//!
//! 凭证是 HS256 JWT，同时在会话存储中记录当前有效的令牌。
//! 校验时两者都必须通过，因此撤销会话后尚未过期的凭证也立即失效。

pub mod token;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

pub use token::{Claims, generate_token, verify_token};

use crate::cache::SessionStore;
use crate::error::{AuthError, StoreResult};

/// 撤销会话的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationReason {
    Logout,
    PasswordChanged,
    RoleChanged,
    StatusChanged,
}

impl RevocationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Logout => "logout",
            Self::PasswordChanged => "password_changed",
            Self::RoleChanged => "role_changed",
            Self::StatusChanged => "status_changed",
        }
    }
}

/// 签发结果
#[derive(Debug, Clone, Serialize)]
pub struct IssuedCredential {
    pub token: String,
    pub expires_at: i64,
}

pub struct AuthService {
    sessions: Arc<SessionStore>,
    secret: String,
    lifetime: Duration,
}

impl AuthService {
    pub fn new(sessions: Arc<SessionStore>, secret: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            sessions,
            secret: secret.into(),
            lifetime,
        }
    }

    /// 签发新凭证并替换该用户之前的会话
    pub async fn sign_in(&self, principal_id: i64, role: &str) -> Result<IssuedCredential, AuthError> {
        let (token, expires_at) = generate_token(principal_id, role, &self.secret, self.lifetime)?;
        self.sessions
            .issue(principal_id, &token, self.lifetime)
            .await?;
        tracing::info!(principal_id, role, "credential issued");
        Ok(IssuedCredential { token, expires_at })
    }

    pub async fn revoke(&self, principal_id: i64, reason: RevocationReason) -> Result<(), AuthError> {
        self.sessions.revoke(principal_id).await?;
        tracing::info!(principal_id, reason = reason.as_str(), "credential revoked");
        Ok(())
    }

    /// 校验凭证，任何无效情况都返回 `Ok(None)`；只有存储故障才返回错误
    pub async fn authenticate(&self, token: &str) -> StoreResult<Option<Claims>> {
        let claims = match verify_token(token, &self.secret) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "rejecting undecodable credential");
                return Ok(None);
            }
        };

        let Some(principal_id) = claims.principal_id() else {
            tracing::debug!(sub = %claims.sub, "credential subject is not a principal id");
            return Ok(None);
        };

        if self.sessions.validate(principal_id, token).await? {
            Ok(Some(claims))
        } else {
            Ok(None)
        }
    }
}
