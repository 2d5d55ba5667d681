use serde::{Deserialize, Serialize};

/// 历史记录条目
///
/// 不可变的追加式记录，数量超限时淘汰最旧的条目。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// 条目 ID（创建时的毫秒时间戳）
    pub id: i64,
    /// 检测到的问题（规范化后的文本）
    pub question: String,
    /// 生成的回答
    pub answer: String,
    /// 检测到问题的页面 URL
    pub url: String,
    /// 创建时间（ISO 8601）
    pub timestamp: String,
}

/// 答案缓存条目
///
/// 以问题文本的哈希为键；超过 TTL 的条目视为不存在，
/// 并在下一次写入时顺带清理。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// 缓存的回答文本
    pub answer: String,
    /// 写入时间（毫秒时间戳）
    pub created_at: i64,
}

impl CacheEntry {
    /// 判断条目是否已过期
    pub fn is_expired(&self, now_ms: i64, ttl_hours: u64) -> bool {
        let ttl_ms = ttl_hours as i64 * 60 * 60 * 1000;
        now_ms - self.created_at > ttl_ms
    }
}
