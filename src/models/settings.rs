use serde::{Deserialize, Serialize};

/// AI 提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    /// OpenAI（chat-completion 协议）
    OpenAi,
    /// Gemini（generate-content 协议）
    Gemini,
}

impl AiProvider {
    /// 提供方名称（用于日志和错误信息）
    pub fn name(self) -> &'static str {
        match self {
            AiProvider::OpenAi => "OpenAI",
            AiProvider::Gemini => "Gemini",
        }
    }
}

/// 悬浮面板位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayPosition {
    pub x: i32,
    pub y: i32,
}

impl Default for OverlayPosition {
    fn default() -> Self {
        Self { x: 20, y: 20 }
    }
}

/// 用户设置
///
/// 启动时从存储加载，每次修改后立即持久化。
/// 缺失的字段按默认值填充（serde default），保证旧版本存储文件可用。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 是否启用助手
    pub enabled: bool,
    /// AI 提供方
    pub ai_provider: AiProvider,
    /// API Key
    pub api_key: String,
    /// 悬浮面板位置
    pub overlay_position: OverlayPosition,
    /// 悬浮面板是否锁定（锁定后不可拖动）
    pub overlay_locked: bool,
    /// 是否自动检测问题
    pub auto_detect: bool,
    /// 回答语言（"id" = 印尼语，"en" = 英语）
    pub response_language: String,
    /// 回答最大长度（词数，同时决定 max_tokens）
    pub max_response_length: u32,
    /// 是否启用答案缓存
    pub cache_enabled: bool,
    /// 缓存过期时间（小时）
    pub cache_expiry_hours: u64,
    /// 调试模式
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: false,
            ai_provider: AiProvider::OpenAi,
            api_key: String::new(),
            overlay_position: OverlayPosition::default(),
            overlay_locked: false,
            auto_detect: true,
            response_language: "id".to_string(),
            max_response_length: 200,
            cache_enabled: true,
            cache_expiry_hours: 24,
            debug: false,
        }
    }
}
