//! 页面扫描器 - 业务能力层
//!
//! 按优先级遍历结构化选择器，从页面提取候选文本并交给分类器判定，
//! 每次扫描最多返回一个"当前问题"。无跨调用状态。

use anyhow::Result;
use phf::phf_map;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

use crate::infrastructure::DomBridge;
use crate::models::DetectionContext;
use crate::services::classifier::TextClassifier;

/// 问题容器选择器，按优先级排列
///
/// 专用的问题容器（test-id / class / id）排在前面，
/// 通用的标题、段落兜底排在最后。排序即决胜规则：
/// 靠前的选择器命中时，靠后的选择器即使也能命中也不再考虑。
const QUESTION_SELECTORS: &[&str] = &[
    // 标准问题选择器
    r#"[data-testid*="question"]"#,
    r#"[data-qa*="question"]"#,
    r#"[data-cy*="question"]"#,
    ".question-text",
    ".interview-question",
    ".question-content",
    r#"[class*="question"]"#,
    r#"[id*="question"]"#,
    // 提示语容器
    ".prompt-text",
    ".prompt-content",
    r#"[class*="prompt"]"#,
    r#"[id*="prompt"]"#,
    // 可能包含问题的通用内容区
    "main h1, main h2, main h3, main h4",
    "section h1, section h2, section h3, section h4",
    ".content h1, .content h2, .content h3, .content h4",
    // 面试平台特有属性
    r#"[data-automation*="question"]"#,
    r#"[aria-label*="question"]"#,
    r#"[role="heading"]"#,
    // 可能承载问题的文本容器
    "p:only-child",
    ".text-content",
    ".interview-text",
    r#"[class*="interview"]"#,
    // 通用兜底
    r#"div[class*="text"]:not([class*="button"]):not([class*="input"])"#,
    r#"span[class*="text"]:not([class*="button"]):not([class*="input"])"#,
];

/// 计时器选择器
const TIMER_SELECTORS: &[&str] = &[
    r#"[data-testid*="timer"]"#,
    ".countdown",
    ".timer",
    r#"[class*="countdown"]"#,
    r#"[id*="timer"]"#,
];

/// 录制指示器选择器
const RECORDING_SELECTORS: &[&str] = &[
    r#"[data-testid*="recording"]"#,
    ".recording",
    r#"[class*="recording"]"#,
    ".rec-indicator",
];

/// 职位名称选择器
const JOB_TITLE_SELECTORS: &[&str] = &[
    r#"[data-testid*="job-title"]"#,
    ".job-title",
    r#"[class*="position"]"#,
    r#"[class*="role"]"#,
];

/// 公司名称选择器
const COMPANY_SELECTORS: &[&str] = &[
    r#"[data-testid*="company"]"#,
    ".company-name",
    r#"[class*="company"]"#,
];

/// 域名 → 面试平台名称
static PLATFORMS: phf::Map<&'static str, &'static str> = phf_map! {
    "hirevue.com" => "HireVue",
    "myinterview.com" => "myInterview",
    "spark-hire.com" => "Spark Hire",
    "vidcruiter.com" => "VidCruiter",
    "talview.com" => "Talview",
    "interview.com" => "Interview.com",
    "zoom.us" => "Zoom",
    "meet.google.com" => "Google Meet",
    "teams.microsoft.com" => "Microsoft Teams",
};

/// 按域名识别面试平台
pub fn platform_for_hostname(hostname: &str) -> &'static str {
    let hostname = hostname.to_lowercase();
    PLATFORMS
        .entries()
        .find(|(domain, _)| hostname.contains(*domain))
        .map(|(_, platform)| *platform)
        .unwrap_or("Unknown")
}

/// 判断 URL 是否属于受支持的面试平台
pub fn is_supported_platform(url: &str) -> bool {
    match reqwest::Url::parse(url) {
        Ok(parsed) => parsed
            .host_str()
            .map(|h| platform_for_hostname(h) != "Unknown")
            .unwrap_or(false),
        Err(_) => false,
    }
}

/// 页面扫描器
///
/// 职责：
/// - 按选择器优先级扫描页面，返回第一个判定为问题的候选
/// - 为被接受的问题构建检测上下文
/// - 不持有"上一个问题"之类的跨调用状态
pub struct PageScanner {
    dom: Arc<dyn DomBridge>,
    classifier: TextClassifier,
    timer_re: Regex,
}

impl PageScanner {
    /// 创建新的页面扫描器
    pub fn new(dom: Arc<dyn DomBridge>, classifier: TextClassifier) -> Result<Self> {
        Ok(Self {
            dom,
            classifier,
            timer_re: Regex::new(r"\d{1,2}:\d{2}")?,
        })
    }

    /// 扫描页面，返回当前问题
    ///
    /// 遍历顺序为"选择器优先级 → 文档顺序"，返回第一个
    /// 分类为问题的候选文本（规范化后）；没有则返回 None。
    pub async fn scan(&self) -> Result<Option<String>> {
        for selector in QUESTION_SELECTORS {
            let texts = self.dom.query_texts(selector).await?;
            for text in texts {
                if let Some(question) = self.classifier.classify(&text) {
                    debug!("选择器 {} 命中问题: {}", selector, question);
                    return Ok(Some(question));
                }
            }
        }
        Ok(None)
    }

    /// 构建检测上下文
    ///
    /// 逐项采集，单项失败只记录 debug 日志并留空，不影响其他字段。
    pub async fn build_context(&self) -> DetectionContext {
        let url = match self.dom.page_url().await {
            Ok(url) => url,
            Err(e) => {
                debug!("读取页面 URL 失败: {}", e);
                String::new()
            }
        };

        let platform = reqwest::Url::parse(&url)
            .ok()
            .and_then(|u| u.host_str().map(platform_for_hostname))
            .unwrap_or("Unknown")
            .to_string();

        DetectionContext {
            platform,
            is_recording: self.detect_recording().await,
            timer: self.detect_timer().await,
            job_title: self.first_text_of(JOB_TITLE_SELECTORS).await,
            company: self.first_text_of(COMPANY_SELECTORS).await,
            timestamp: chrono::Utc::now().to_rfc3339(),
            url,
        }
    }

    /// 检测录制指示器是否可见
    async fn detect_recording(&self) -> bool {
        for selector in RECORDING_SELECTORS {
            match self.dom.any_visible(selector).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => debug!("录制指示器探测失败 ({}): {}", selector, e),
            }
        }
        false
    }

    /// 检测可见的倒计时文本
    async fn detect_timer(&self) -> Option<String> {
        for selector in TIMER_SELECTORS {
            match self.dom.first_visible_text(selector).await {
                Ok(Some(text)) => {
                    if self.timer_re.is_match(&text) {
                        return Some(text.trim().to_string());
                    }
                }
                Ok(None) => {}
                Err(e) => debug!("计时器探测失败 ({}): {}", selector, e),
            }
        }
        None
    }

    /// 取第一个非空文本（用于职位 / 公司提示）
    async fn first_text_of(&self, selectors: &[&str]) -> Option<String> {
        for selector in selectors {
            match self.dom.query_texts(selector).await {
                Ok(texts) => {
                    if let Some(text) = texts.iter().map(|t| t.trim()).find(|t| !t.is_empty()) {
                        return Some(text.to_string());
                    }
                }
                Err(e) => debug!("上下文提取失败 ({}): {}", selector, e),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// 脚本化的假页面：按选择器返回配置好的文本
    #[derive(Default)]
    struct FakeDom {
        texts: Mutex<HashMap<String, Vec<String>>>,
        visible: Mutex<HashMap<String, String>>,
        url: String,
    }

    impl FakeDom {
        fn with_texts(entries: &[(&str, &[&str])]) -> Self {
            let mut map = HashMap::new();
            for (selector, texts) in entries {
                map.insert(
                    selector.to_string(),
                    texts.iter().map(|t| t.to_string()).collect(),
                );
            }
            Self {
                texts: Mutex::new(map),
                visible: Mutex::new(HashMap::new()),
                url: "https://app.hirevue.com/interview/42".to_string(),
            }
        }
    }

    #[async_trait]
    impl DomBridge for FakeDom {
        async fn query_texts(&self, selector: &str) -> Result<Vec<String>> {
            Ok(self
                .texts
                .lock()
                .unwrap()
                .get(selector)
                .cloned()
                .unwrap_or_default())
        }

        async fn first_visible_text(&self, selector: &str) -> Result<Option<String>> {
            Ok(self.visible.lock().unwrap().get(selector).cloned())
        }

        async fn any_visible(&self, selector: &str) -> Result<bool> {
            Ok(self.visible.lock().unwrap().contains_key(selector))
        }

        async fn page_url(&self) -> Result<String> {
            Ok(self.url.clone())
        }

        async fn install_change_probe(&self) -> Result<()> {
            Ok(())
        }

        async fn take_dirty(&self) -> Result<bool> {
            Ok(false)
        }
    }

    fn scanner(dom: FakeDom) -> PageScanner {
        PageScanner::new(Arc::new(dom), TextClassifier::new().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_scan_returns_first_positive() {
        let dom = FakeDom::with_texts(&[(
            ".question-text",
            &["not a q", "What motivates you at work?"][..],
        )]);
        let s = scanner(dom);
        assert_eq!(
            s.scan().await.unwrap().as_deref(),
            Some("What motivates you at work?")
        );
    }

    #[tokio::test]
    async fn test_scan_selector_precedence() {
        // 两个选择器都有问题，靠前的选择器获胜
        let dom = FakeDom::with_texts(&[
            (".question-text", &["How do you prioritize tasks?"][..]),
            ("p:only-child", &["Why did you leave your last job?"][..]),
        ]);
        let s = scanner(dom);
        assert_eq!(
            s.scan().await.unwrap().as_deref(),
            Some("How do you prioritize tasks?")
        );
    }

    #[tokio::test]
    async fn test_scan_none_when_nothing_classifies() {
        let dom = FakeDom::with_texts(&[(".question-text", &["12345", "hi"][..])]);
        let s = scanner(dom);
        assert_eq!(s.scan().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_scan_normalizes_candidate() {
        let dom = FakeDom::with_texts(&[(
            r#"[data-testid*="question"]"#,
            &["Question:   Tell me about  your experience "][..],
        )]);
        let s = scanner(dom);
        assert_eq!(
            s.scan().await.unwrap().as_deref(),
            Some("Tell me about your experience")
        );
    }

    #[tokio::test]
    async fn test_context_platform_and_timer() {
        let dom = FakeDom::with_texts(&[]);
        dom.visible
            .lock()
            .unwrap()
            .insert(".timer".to_string(), " 00:45 ".to_string());
        dom.visible
            .lock()
            .unwrap()
            .insert(".recording".to_string(), String::new());
        let s = scanner(dom);
        let ctx = s.build_context().await;
        assert_eq!(ctx.platform, "HireVue");
        assert!(ctx.is_recording);
        assert_eq!(ctx.timer.as_deref(), Some("00:45"));
    }

    #[tokio::test]
    async fn test_context_timer_requires_time_pattern() {
        let dom = FakeDom::with_texts(&[]);
        dom.visible
            .lock()
            .unwrap()
            .insert(".timer".to_string(), "recording soon".to_string());
        let s = scanner(dom);
        let ctx = s.build_context().await;
        assert_eq!(ctx.timer, None);
    }

    #[test]
    fn test_platform_lookup() {
        assert_eq!(platform_for_hostname("app.hirevue.com"), "HireVue");
        assert_eq!(platform_for_hostname("us02web.zoom.us"), "Zoom");
        assert_eq!(platform_for_hostname("example.org"), "Unknown");
    }

    #[test]
    fn test_supported_platform_check() {
        assert!(is_supported_platform("https://meet.google.com/abc-defg-hij"));
        assert!(!is_supported_platform("https://news.ycombinator.com/"));
        assert!(!is_supported_platform("not a url"));
    }
}
