use serde::Deserialize;
use std::path::Path;
use tracing::warn;

/// 程序配置文件
///
/// 进程级配置（端点、路径、调度参数），与持久化的用户设置
/// （`models::Settings`）分开管理。
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 本地存储文件路径（设置 / 历史 / 答案缓存）
    pub storage_path: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- AI 后端配置 ---
    /// OpenAI 兼容端点
    pub openai_api_base: String,
    /// Gemini 端点
    pub gemini_api_base: String,
    // --- 检测调度配置 ---
    /// DOM 变化后的防抖延迟（毫秒）
    pub debounce_ms: u64,
    /// 周期性兜底扫描间隔（秒）
    pub periodic_secs: u64,
    /// 启动后首次扫描的延迟（毫秒），等待页面自身渲染完成
    pub initial_delay_ms: u64,
    /// 变更探针的轮询间隔（毫秒）
    pub mutation_poll_ms: u64,
    // --- 历史记录配置 ---
    /// 历史记录上限（超出后淘汰最旧的条目）
    pub max_history_entries: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 9222,
            storage_path: "interview_copilot_store.json".to_string(),
            verbose_logging: false,
            openai_api_base: "https://api.openai.com/v1".to_string(),
            gemini_api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            debounce_ms: 500,
            periodic_secs: 3,
            initial_delay_ms: 1000,
            mutation_poll_ms: 250,
            max_history_entries: 50,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_debug_port),
            storage_path: std::env::var("STORAGE_PATH").unwrap_or(default.storage_path),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            openai_api_base: std::env::var("OPENAI_API_BASE").unwrap_or(default.openai_api_base),
            gemini_api_base: std::env::var("GEMINI_API_BASE").unwrap_or(default.gemini_api_base),
            debounce_ms: std::env::var("DEBOUNCE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.debounce_ms),
            periodic_secs: std::env::var("PERIODIC_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.periodic_secs),
            initial_delay_ms: std::env::var("INITIAL_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.initial_delay_ms),
            mutation_poll_ms: std::env::var("MUTATION_POLL_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.mutation_poll_ms),
            max_history_entries: std::env::var("MAX_HISTORY_ENTRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_history_entries),
        }
    }

    /// 从 TOML 文件加载配置
    ///
    /// 文件不存在或解析失败时回退到环境变量 + 默认值。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!("配置文件解析失败 ({}): {}，使用默认配置", path.display(), e);
                    Self::from_env()
                }
            },
            Err(_) => Self::from_env(),
        }
    }
}
