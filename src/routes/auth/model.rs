use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckTokenResponse {
    pub principal_id: i64,
    pub role: String,
    pub expires_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignOutResponse {
    pub principal_id: i64,
}
