//! # Interview Copilot
//!
//! 面试问题实时检测与回答辅助工具
//!
//! 附着到一个已开启调试端口的浏览器上，监测面试平台页面中
//! 出现的问题，调用 AI 后端生成口语化回答并展示在悬浮面板里。
//!
//! ## 架构设计
//!
//! 本系统采用严格的分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `DomInspector` - 唯一的 page owner，提供选择器取文本 / 可见性 / 变更信号能力
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个问题
//! - `TextClassifier` - 问题判定与规范化能力
//! - `PageScanner` - 页面扫描与上下文提取能力
//! - `QuestionDetector` - 检测调度（防抖 / 周期 / 首扫）与去重分发
//! - `AiService` - 问题 → 回答能力（OpenAI / Gemini，带缓存）
//! - `StorageManager` - 设置 / 历史 / 缓存的持久化能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个问题"的完整展示流程
//! - `OverlayController` - 面板状态机（加载 → 展示 / 报错 → 写历史），
//!   纪元守护保证旧问题的回答不会覆盖新问题
//!
//! ### ④ 编排层（App）
//! - `app` - 组装各层、管理启用开关和进程生命周期
//!
//! ## 模块结构

pub mod app;
pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use browser::connect_to_interview_page;
pub use config::Config;
pub use error::{AppError, AppResult, BackendError, ConfigError, StoreError};
pub use infrastructure::{DomBridge, DomInspector};
pub use models::{AiProvider, DetectionContext, HistoryEntry, OverlayPosition, Settings};
pub use services::{
    AiService, PageScanner, QuestionDetector, StorageManager, TextClassifier,
};
pub use workflow::{OverlayController, OverlayState};
