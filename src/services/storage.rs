//! 本地存储 - 业务能力层
//!
//! 设置、历史记录和答案缓存保存在同一个 JSON 文件里，
//! 每个操作都是"整读 → 改 → 整写"。存储出问题时降级处理：
//! 读取失败返回默认值 / 空列表，写入失败只记日志，绝不让主流程崩溃。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::{CacheEntry, HistoryEntry, Settings};

/// 持久化的数据整体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct StoreBlob {
    settings: Settings,
    history: Vec<HistoryEntry>,
    response_cache: HashMap<String, CacheEntry>,
}

/// 问题文本的缓存键
///
/// 32 位滚动哈希，逐 UTF-16 码元计算 `hash = hash * 31 + unit`（回绕），
/// 以十进制字符串呈现。非加密哈希，碰撞时会返回错误问题的缓存答案，
/// 这是已知的接受限制。
pub fn question_hash(text: &str) -> String {
    let mut hash: i32 = 0;
    for unit in text.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(unit as i32);
    }
    hash.to_string()
}

/// 本地存储管理器
///
/// 职责：
/// - 设置的读取（与默认值合并）和保存
/// - 历史记录的追加（封顶淘汰）、读取和清空
/// - 答案缓存的读写（写入时顺带清理过期条目）
pub struct StorageManager {
    path: PathBuf,
    max_history_entries: usize,
}

impl StorageManager {
    /// 创建新的存储管理器
    pub fn new(path: impl Into<PathBuf>, max_history_entries: usize) -> Self {
        Self {
            path: path.into(),
            max_history_entries,
        }
    }

    /// 读取整个存储文件
    async fn read_blob(&self) -> Result<StoreBlob, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            // 文件尚不存在是首次运行的正常状态
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoreBlob::default())
            }
            Err(e) => {
                return Err(StoreError::ReadFailed {
                    path: self.path.display().to_string(),
                    source: e,
                })
            }
        };
        serde_json::from_str(&content).map_err(|e| StoreError::ParseFailed { source: e })
    }

    /// 写回整个存储文件
    async fn write_blob(&self, blob: &StoreBlob) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(blob)
            .map_err(|e| StoreError::ParseFailed { source: e })?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| StoreError::WriteFailed {
                path: self.path.display().to_string(),
                source: e,
            })
    }

    /// 读取存储数据，任何读取 / 解析失败都降级为默认数据
    async fn load(&self) -> StoreBlob {
        match self.read_blob().await {
            Ok(blob) => blob,
            Err(e) => {
                warn!("{}，使用默认数据", e);
                StoreBlob::default()
            }
        }
    }

    /// 持久化存储数据，失败只记日志（降级），返回是否成功
    async fn persist(&self, blob: &StoreBlob) -> bool {
        match self.write_blob(blob).await {
            Ok(()) => true,
            Err(e) => {
                warn!("{}", e);
                false
            }
        }
    }

    // ========== 设置 ==========

    /// 读取设置（缺失字段与默认值合并，永不失败）
    pub async fn get_settings(&self) -> Settings {
        self.load().await.settings
    }

    /// 保存整份设置
    pub async fn save_settings(&self, settings: Settings) -> bool {
        let mut blob = self.load().await;
        blob.settings = settings;
        self.persist(&blob).await
    }

    /// 修改单项设置并立即持久化
    pub async fn update_setting<F>(&self, apply: F) -> Settings
    where
        F: FnOnce(&mut Settings),
    {
        let mut blob = self.load().await;
        apply(&mut blob.settings);
        let updated = blob.settings.clone();
        self.persist(&blob).await;
        updated
    }

    // ========== 历史记录 ==========

    /// 读取历史记录（最新的在前）
    pub async fn get_history(&self) -> Vec<HistoryEntry> {
        self.load().await.history
    }

    /// 追加历史记录
    ///
    /// 新条目插到最前面，超出上限时淘汰最旧的条目。
    pub async fn add_to_history(&self, question: &str, answer: &str, url: &str) -> bool {
        let now = chrono::Utc::now();
        let entry = HistoryEntry {
            id: now.timestamp_millis(),
            question: question.to_string(),
            answer: answer.to_string(),
            url: url.to_string(),
            timestamp: now.to_rfc3339(),
        };

        let mut blob = self.load().await;
        blob.history.insert(0, entry);
        blob.history.truncate(self.max_history_entries);
        self.persist(&blob).await
    }

    /// 清空历史记录
    pub async fn clear_history(&self) -> bool {
        let mut blob = self.load().await;
        blob.history.clear();
        self.persist(&blob).await
    }

    // ========== 答案缓存 ==========

    /// 查询缓存的回答
    ///
    /// 过期（超过 `ttl_hours`）的条目视为不存在。
    pub async fn get_cached_response(&self, question: &str, ttl_hours: u64) -> Option<String> {
        let blob = self.load().await;
        let key = question_hash(question);
        let entry = blob.response_cache.get(&key)?;
        let now_ms = chrono::Utc::now().timestamp_millis();
        if entry.is_expired(now_ms, ttl_hours) {
            debug!("缓存条目已过期: {}", key);
            return None;
        }
        Some(entry.answer.clone())
    }

    /// 写入回答缓存
    ///
    /// 同一次写入中顺带清理所有过期条目。
    pub async fn cache_response(&self, question: &str, answer: &str, ttl_hours: u64) -> bool {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let mut blob = self.load().await;

        blob.response_cache.insert(
            question_hash(question),
            CacheEntry {
                answer: answer.to_string(),
                created_at: now_ms,
            },
        );
        blob.response_cache
            .retain(|_, entry| !entry.is_expired(now_ms, ttl_hours));

        self.persist(&blob).await
    }

    /// 直接写入一条缓存（供测试构造过期条目）
    #[cfg(test)]
    pub(crate) async fn insert_cache_entry(&self, question: &str, entry: CacheEntry) {
        let mut blob = self.load().await;
        blob.response_cache.insert(question_hash(question), entry);
        self.persist(&blob).await;
    }
}
