/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化日志
///
/// 默认级别由 `verbose` 决定（info / debug），
/// 环境变量 `RUST_LOG` 存在时优先生效。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `config`: 进程配置
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 面试问题检测与回答模式");
    info!("🔌 浏览器调试端口: {}", config.browser_debug_port);
    info!("💾 本地存储文件: {}", config.storage_path);
    info!("{}", "=".repeat(60));
}

/// 记录检测调度参数
///
/// # 参数
/// - `config`: 进程配置
pub fn log_detection_schedule(config: &Config) {
    info!("⏱️ 防抖延迟: {} 毫秒", config.debounce_ms);
    info!("⏱️ 周期扫描间隔: {} 秒", config.periodic_secs);
    info!("⏱️ 首次扫描延迟: {} 毫秒\n", config.initial_delay_ms);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
