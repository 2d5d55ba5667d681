//! 应用编排层
//!
//! 负责把各层组装起来：存储 → 浏览器 → 扫描 → 检测 → 面板，
//! 并管理"启用开关"和进程生命周期。

use anyhow::Result;
use chromiumoxide::Browser;
use std::sync::Arc;
use tracing::{info, warn};

use crate::browser;
use crate::config::Config;
use crate::infrastructure::{DomBridge, DomInspector};
use crate::models::Settings;
use crate::services::{
    AiService, DetectorTiming, PageScanner, QuestionDetector, StorageManager, TextClassifier,
};
use crate::utils::logging::{log_detection_schedule, log_startup};
use crate::workflow::OverlayController;

/// 应用主结构
pub struct App {
    storage: Arc<StorageManager>,
    ai: Arc<AiService>,
    overlay: Arc<OverlayController>,
    detector: Arc<QuestionDetector>,
    // 连接在 browser 存活期间有效
    _browser: Browser,
}

impl App {
    /// 初始化应用
    ///
    /// 组装顺序：存储 → 浏览器连接 → DOM 检查器 → 扫描器 →
    /// AI 服务 → 面板控制器 → 检测器，最后把"检测到问题"
    /// 接到面板流程上。
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let storage = Arc::new(StorageManager::new(
            &config.storage_path,
            config.max_history_entries,
        ));
        let settings = storage.get_settings().await;
        info!("🤖 AI 提供方: {}", settings.ai_provider.name());
        info!("🗣️ 回答语言: {}", settings.response_language);
        log_detection_schedule(&config);

        // 连接浏览器
        let (browser, page) =
            browser::connect_to_interview_page(config.browser_debug_port).await?;

        let dom: Arc<dyn DomBridge> = Arc::new(DomInspector::new(page));
        let scanner = Arc::new(PageScanner::new(Arc::clone(&dom), TextClassifier::new()?)?);
        let ai = Arc::new(AiService::new(&config, Arc::clone(&storage)));
        let overlay = Arc::new(OverlayController::new(
            Arc::clone(&ai),
            Arc::clone(&storage),
        ));
        let detector = Arc::new(QuestionDetector::new(
            scanner,
            dom,
            DetectorTiming::from_config(&config),
        ));

        // 检测到新问题 → 面板流程（不阻塞检测循环）
        let overlay_for_detection = Arc::clone(&overlay);
        detector.on_question(move |question, context| {
            let overlay = Arc::clone(&overlay_for_detection);
            let question = question.to_string();
            let context = context.clone();
            tokio::spawn(async move {
                overlay.handle_detection(&question, &context).await;
            });
            Ok(())
        });

        Ok(Self {
            storage,
            ai,
            overlay,
            detector,
            _browser: browser,
        })
    }

    /// 运行应用主逻辑
    ///
    /// 启用时开始监测，Ctrl+C 后停止监测并退出。
    pub async fn run(&self) -> Result<()> {
        let settings = self.storage.get_settings().await;
        if !settings.enabled {
            warn!("⚠️ 助手未启用（enabled = false），程序结束");
            return Ok(());
        }
        if settings.api_key.is_empty() {
            warn!("⚠️ 尚未配置 API Key，检测到问题后将无法生成回答");
        }

        if settings.auto_detect {
            self.detector.start();
        } else {
            info!("自动检测已关闭，等待手动触发");
        }

        info!("💡 按 Ctrl+C 退出");
        tokio::signal::ctrl_c().await?;

        self.detector.stop();
        info!("👋 程序退出");
        Ok(())
    }

    /// 应用一份新设置
    ///
    /// 新的 API Key 先做可达性校验，未通过则整份设置不保存；
    /// 保存成功后按 enabled 开关启停检测。返回是否保存成功。
    pub async fn apply_settings(&self, new_settings: Settings) -> bool {
        let old = self.storage.get_settings().await;

        if !new_settings.api_key.is_empty() && new_settings.api_key != old.api_key {
            if !self
                .ai
                .validate_api_key(new_settings.ai_provider, &new_settings.api_key)
                .await
            {
                warn!("❌ API Key 校验未通过，设置未保存");
                return false;
            }
            info!("✓ API Key 校验通过");
        }

        let saved = self.storage.save_settings(new_settings.clone()).await;
        if saved {
            if new_settings.enabled && !self.detector.is_monitoring() {
                self.detector.start();
            } else if !new_settings.enabled && self.detector.is_monitoring() {
                self.detector.stop();
            }
        }
        saved
    }

    /// 面板控制器（重新生成 / 复制 / 位置管理入口）
    pub fn overlay(&self) -> &Arc<OverlayController> {
        &self.overlay
    }

    /// 问题检测器
    pub fn detector(&self) -> &Arc<QuestionDetector> {
        &self.detector
    }
}
