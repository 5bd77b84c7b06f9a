use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // 用户ID
    pub role: String, // 角色
    pub jti: String,  // 令牌唯一标识
    pub exp: i64,     // 过期时间
    pub iat: i64,     // 签发时间
}

impl Claims {
    pub fn principal_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

pub fn generate_token(
    principal_id: i64,
    role: &str,
    secret: &str,
    lifetime: Duration,
) -> Result<(String, i64), jsonwebtoken::errors::Error> {
    let issued_at = Utc::now().timestamp();
    let expiration = issued_at.saturating_add(lifetime.as_secs() as i64);

    let claims = Claims {
        sub: principal_id.to_string(),
        role: role.to_string(),
        jti: Uuid::new_v4().to_string(),
        exp: expiration,
        iat: issued_at,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, expiration))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}
