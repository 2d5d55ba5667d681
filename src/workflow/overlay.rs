//! 悬浮面板控制器 - 流程层
//!
//! 定义"一个问题"的完整展示流程：
//! 检测 → 进入加载态 → 生成回答 → 展示 / 报错 → 写历史。
//!
//! 面板状态由纪元号守护：每次进入加载态纪元加一，
//! 回答带着发起时的纪元号回来，不匹配就整体丢弃。
//! 这保证了更新的问题出现后，旧问题的回答（无论多晚到达）
//! 永远不会覆盖面板。

use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::models::{DetectionContext, OverlayPosition};
use crate::services::ai_service::AiService;
use crate::services::storage::StorageManager;
use crate::utils::logging::truncate_text;

/// 面板状态
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayState {
    /// 空闲，等待问题
    Idle,
    /// 正在为某个问题生成回答
    Loading { question: String },
    /// 回答已就绪
    Ready { question: String, answer: String },
    /// 生成失败
    Error { question: String, message: String },
}

struct OverlayInner {
    state: OverlayState,
    /// 加载纪元，每次进入加载态加一
    epoch: u64,
    minimized: bool,
    last_context: Option<DetectionContext>,
}

/// 悬浮面板控制器
///
/// 职责：
/// - 维护面板状态机（Idle / Loading / Ready / Error）
/// - 纪元守护：丢弃过期问题的回答
/// - 成功展示后写入历史记录
/// - 面板位置 / 锁定 / 最小化的管理与持久化
pub struct OverlayController {
    ai: Arc<AiService>,
    storage: Arc<StorageManager>,
    inner: Mutex<OverlayInner>,
}

impl OverlayController {
    /// 创建新的面板控制器
    pub fn new(ai: Arc<AiService>, storage: Arc<StorageManager>) -> Self {
        Self {
            ai,
            storage,
            inner: Mutex::new(OverlayInner {
                state: OverlayState::Idle,
                epoch: 0,
                minimized: false,
                last_context: None,
            }),
        }
    }

    /// 当前面板状态
    pub fn state(&self) -> OverlayState {
        self.inner.lock().unwrap().state.clone()
    }

    pub fn is_minimized(&self) -> bool {
        self.inner.lock().unwrap().minimized
    }

    /// 处理一个新检测到的问题（完整流程）
    ///
    /// 失败不向上传播，体现在面板的 Error 状态里。
    pub async fn handle_detection(&self, question: &str, context: &DetectionContext) {
        let epoch = self.begin_loading(question, context);
        info!("💬 开始生成回答 {}", context);

        match self.ai.generate_answer(question, context).await {
            Ok(answer) => {
                if self.apply_answer(epoch, question, &answer) {
                    self.storage
                        .add_to_history(question, &answer, &context.url)
                        .await;
                }
            }
            Err(e) => {
                warn!("生成回答失败: {}", e);
                self.apply_error(epoch, question, &e.to_string());
            }
        }
    }

    /// 为当前问题重新生成回答
    ///
    /// 沿用上次的检测上下文；无当前问题时什么也不做。
    pub async fn regenerate(&self) -> bool {
        let (question, context) = {
            let inner = self.inner.lock().unwrap();
            let question = match &inner.state {
                OverlayState::Idle => return false,
                OverlayState::Loading { question }
                | OverlayState::Ready { question, .. }
                | OverlayState::Error { question, .. } => question.clone(),
            };
            (question, inner.last_context.clone().unwrap_or_default())
        };

        info!("🔄 重新生成回答: {}", truncate_text(&question, 80));
        self.handle_detection(&question, &context).await;
        true
    }

    /// 进入加载态，返回本次加载的纪元号
    ///
    /// 新问题到来时面板总是展开。
    fn begin_loading(&self, question: &str, context: &DetectionContext) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        inner.epoch += 1;
        inner.state = OverlayState::Loading {
            question: question.to_string(),
        };
        inner.minimized = false;
        inner.last_context = Some(context.clone());
        inner.epoch
    }

    /// 应用生成好的回答
    ///
    /// 纪元号不匹配说明期间出现了更新的问题，整体丢弃。
    /// 返回是否真正应用。
    fn apply_answer(&self, epoch: u64, question: &str, answer: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.epoch != epoch {
            debug!("丢弃过期问题的回答: {}", truncate_text(question, 80));
            return false;
        }
        inner.state = OverlayState::Ready {
            question: question.to_string(),
            answer: answer.to_string(),
        };
        true
    }

    /// 应用生成失败的错误信息（同样受纪元守护）
    fn apply_error(&self, epoch: u64, question: &str, message: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.epoch != epoch {
            debug!("丢弃过期问题的错误: {}", truncate_text(question, 80));
            return false;
        }
        inner.state = OverlayState::Error {
            question: question.to_string(),
            message: message.to_string(),
        };
        true
    }

    /// 取出当前回答文本（供复制），仅 Ready 态有值
    pub fn copy_answer(&self) -> Option<String> {
        match &self.inner.lock().unwrap().state {
            OverlayState::Ready { answer, .. } => Some(answer.clone()),
            _ => None,
        }
    }

    /// 最小化 / 展开面板
    pub fn set_minimized(&self, minimized: bool) {
        self.inner.lock().unwrap().minimized = minimized;
    }

    /// 切换面板锁定状态并持久化，返回新状态
    pub async fn toggle_lock(&self) -> bool {
        let updated = self
            .storage
            .update_setting(|s| s.overlay_locked = !s.overlay_locked)
            .await;
        info!(
            "📌 面板{}",
            if updated.overlay_locked { "已锁定" } else { "已解锁" }
        );
        updated.overlay_locked
    }

    /// 移动面板并持久化位置
    ///
    /// 锁定状态下拖动无效，返回是否移动成功。
    pub async fn set_position(&self, position: OverlayPosition) -> bool {
        let settings = self.storage.get_settings().await;
        if settings.overlay_locked {
            debug!("面板已锁定，忽略移动请求");
            return false;
        }
        self.storage
            .update_setting(|s| s.overlay_position = position)
            .await;
        true
    }
}
