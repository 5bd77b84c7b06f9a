use serde::{Serialize, de::DeserializeOwned};

/// 空值缓存标记，表示实体已确认不存在
pub const ABSENT_SENTINEL: &str = "HIT_NONE";

/// 缓存中保存的内容：序列化后的实体，或空值标记
#[derive(Debug, Clone, PartialEq)]
pub enum CachedPayload<T> {
    Present(T),
    Absent,
}

impl<T: Serialize> CachedPayload<T> {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        match self {
            CachedPayload::Present(entity) => serde_json::to_string(entity),
            CachedPayload::Absent => Ok(ABSENT_SENTINEL.to_string()),
        }
    }
}

impl<T: DeserializeOwned> CachedPayload<T> {
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        if raw == ABSENT_SENTINEL {
            return Ok(CachedPayload::Absent);
        }
        serde_json::from_str(raw).map(CachedPayload::Present)
    }
}
