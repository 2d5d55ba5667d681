//! 检测上下文
//!
//! 封装"这个问题是在什么环境下被检测到的"这一信息，
//! 仅用于构建提示词，不单独持久化。

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// 检测上下文
///
/// 问题被接受时由扫描器一次性构建的元数据。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionContext {
    /// 页面 URL
    pub url: String,
    /// 检测时间（ISO 8601）
    pub timestamp: String,
    /// 面试平台名称（按域名识别，未识别时为 "Unknown"）
    pub platform: String,
    /// 是否检测到录制指示器
    pub is_recording: bool,
    /// 倒计时文本（如 "00:30"），不可见或无计时器时为 None
    pub timer: Option<String>,
    /// 从页面提取的职位名称
    pub job_title: Option<String>,
    /// 从页面提取的公司名称
    pub company: Option<String>,
}

impl Display for DetectionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[平台#{} 录制#{} 计时#{}]",
            self.platform,
            self.is_recording,
            self.timer.as_deref().unwrap_or("-")
        )
    }
}
