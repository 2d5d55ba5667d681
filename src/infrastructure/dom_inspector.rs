//! DOM 检查器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"读取页面"的能力：
//! 按选择器取文本、可见性探测、变更信号。
//! 不认识 Question / Settings，不处理业务流程。

use anyhow::Result;
use async_trait::async_trait;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use tracing::debug;

/// 页面读取能力
///
/// 扫描器和检测器只依赖这个 trait，不直接接触 chromiumoxide，
/// 便于在测试中用脚本化的假页面替换。
#[async_trait]
pub trait DomBridge: Send + Sync {
    /// 按选择器返回所有匹配元素的文本，保持文档顺序
    async fn query_texts(&self, selector: &str) -> Result<Vec<String>>;

    /// 返回第一个可见匹配元素的文本
    ///
    /// 可见 = 包围盒非零、未隐藏、非 display:none、透明度非零。
    async fn first_visible_text(&self, selector: &str) -> Result<Option<String>>;

    /// 判断是否存在可见的匹配元素
    async fn any_visible(&self, selector: &str) -> Result<bool>;

    /// 当前页面 URL
    async fn page_url(&self) -> Result<String>;

    /// 安装变更探针
    ///
    /// 在页面内注册 MutationObserver（childList + characterData，子树级），
    /// 变化时置脏标记。重复调用是幂等的。
    async fn install_change_probe(&self) -> Result<()>;

    /// 读取并清除脏标记
    async fn take_dirty(&self) -> Result<bool>;
}

/// 可见性判定的页面内辅助函数
const VISIBILITY_HELPER: &str = r#"
    const __vis = (el) => {
        if (!el) return false;
        const rect = el.getBoundingClientRect();
        const style = window.getComputedStyle(el);
        return rect.width > 0 && rect.height > 0 &&
            style.visibility !== 'hidden' &&
            style.display !== 'none' &&
            style.opacity !== '0';
    };
"#;

/// DOM 检查器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 把 `DomBridge` 的每个能力翻译为页面内执行的 JS
/// - 所有选择器都经过 JSON 转义后注入脚本
pub struct DomInspector {
    page: Page,
}

impl DomInspector {
    /// 创建新的 DOM 检查器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并反序列化为指定类型
    async fn eval_as<T: DeserializeOwned>(&self, js_code: String) -> Result<T> {
        let result = self.page.evaluate(js_code).await?;
        let typed_value = result.into_value()?;
        Ok(typed_value)
    }
}

#[async_trait]
impl DomBridge for DomInspector {
    async fn query_texts(&self, selector: &str) -> Result<Vec<String>> {
        let selector_json = serde_json::to_string(selector)?;
        let script = format!(
            r#"
            (() => {{
                const out = [];
                for (const el of document.querySelectorAll({selector_json})) {{
                    out.push(el.textContent || el.innerText || '');
                }}
                return out;
            }})()
            "#
        );
        self.eval_as(script).await
    }

    async fn first_visible_text(&self, selector: &str) -> Result<Option<String>> {
        let selector_json = serde_json::to_string(selector)?;
        let script = format!(
            r#"
            (() => {{
                {VISIBILITY_HELPER}
                for (const el of document.querySelectorAll({selector_json})) {{
                    if (__vis(el)) return el.textContent || '';
                }}
                return null;
            }})()
            "#
        );
        self.eval_as(script).await
    }

    async fn any_visible(&self, selector: &str) -> Result<bool> {
        let selector_json = serde_json::to_string(selector)?;
        let script = format!(
            r#"
            (() => {{
                {VISIBILITY_HELPER}
                for (const el of document.querySelectorAll({selector_json})) {{
                    if (__vis(el)) return true;
                }}
                return false;
            }})()
            "#
        );
        self.eval_as(script).await
    }

    async fn page_url(&self) -> Result<String> {
        self.eval_as("window.location.href".to_string()).await
    }

    async fn install_change_probe(&self) -> Result<()> {
        let script = r#"
            (() => {
                if (window.__icProbe) return true;
                window.__icDirty = false;
                const observer = new MutationObserver(() => {
                    window.__icDirty = true;
                });
                observer.observe(document.body, {
                    childList: true,
                    subtree: true,
                    characterData: true
                });
                window.__icProbe = observer;
                return true;
            })()
        "#;
        let installed: bool = self.eval_as(script.to_string()).await?;
        debug!("变更探针安装结果: {}", installed);
        Ok(())
    }

    async fn take_dirty(&self) -> Result<bool> {
        let script = r#"
            (() => {
                const dirty = window.__icDirty === true;
                window.__icDirty = false;
                return dirty;
            })()
        "#;
        self.eval_as(script.to_string()).await
    }
}
