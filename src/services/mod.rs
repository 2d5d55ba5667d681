//! 业务能力层
//!
//! 每个服务描述"我能做什么"，只处理单个问题，不编排流程：
//! - `classifier` - 文本是否是面试问题
//! - `scanner` - 从页面里找出问题和上下文
//! - `detector` - 监测调度（防抖 / 周期 / 首扫）与去重分发
//! - `ai_service` - 问题 → 回答（带缓存）
//! - `storage` - 设置 / 历史 / 缓存的本地持久化

pub mod ai_service;
pub mod classifier;
pub mod detector;
pub mod scanner;
pub mod storage;

pub use ai_service::AiService;
pub use classifier::TextClassifier;
pub use detector::{DetectorTiming, QuestionDetector};
pub use scanner::PageScanner;
pub use storage::StorageManager;
