//! 文本分类器 - 业务能力层
//!
//! 只负责"这段文字像不像面试问题"的启发式判断，无状态、无副作用，
//! 相同输入永远返回相同结果。
//!
//! 判定规则：规范化后长度在 10..=1000 之间，含有字母且不是纯数字，
//! 并且命中问号 / 疑问触发词（英语 + 印尼语）/ 疑问句式正则 三者之一。

use anyhow::Result;
use regex::Regex;

/// 疑问触发词（大小写不敏感的子串匹配）
const QUESTION_INDICATORS: &[&str] = &[
    "?",
    // 英语疑问词
    "what", "how", "why", "when", "where", "who", "which", "whose",
    "tell me", "describe", "explain", "discuss", "share",
    "give me an example", "walk me through", "can you",
    "would you", "could you", "do you", "have you",
    "are you", "will you", "did you", "if you",
    "think about", "talk about", "your experience",
    "your background", "your approach", "your thoughts",
    // 印尼语疑问词
    "apa", "bagaimana", "mengapa", "kapan", "dimana", "siapa",
    "ceritakan", "jelaskan", "berikan contoh", "bisakah",
    "dapatkah", "apakah", "pengalaman", "pendapat",
];

/// 疑问句式正则（锚定常见的面试问法）
const QUESTION_PATTERNS: &[&str] = &[
    r"(?i)^(what|how|why|when|where|who|which|whose)\b",
    r"(?i)\b(tell|describe|explain|discuss|share)\b.*\b(about|your|us|me)\b",
    r"(?i)\b(can|could|would|will|do|did|have|are)\s+you\b",
    r"(?i)\bwalk\s+(me|us)\s+through\b",
    r"(?i)\bgive\s+(me|us)\s+an?\s+example\b",
    r"(?i)\bthink\s+about\b",
    r"(?i)\btalk\s+about\b",
    r"(?i)\byour\s+(experience|background|approach|thoughts|opinion)\b",
];

/// 文本分类器
///
/// 职责：
/// - 候选文本的规范化（压缩空白、剥离题号前缀）
/// - 判断文本是否为面试问题
/// - 不访问页面，不持有任何资源
///
/// 正则在构造时编译一次，之后全程复用。
pub struct TextClassifier {
    whitespace_re: Regex,
    label_prefix_re: Regex,
    ordinal_prefix_re: Regex,
    patterns: Vec<Regex>,
}

impl TextClassifier {
    /// 创建新的文本分类器
    pub fn new() -> Result<Self> {
        let patterns = QUESTION_PATTERNS
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            whitespace_re: Regex::new(r"\s+")?,
            label_prefix_re: Regex::new(r"(?i)^(question|q\d*\.?|interview question|problem):?\s*")?,
            ordinal_prefix_re: Regex::new(r"^\d+\.?\s*")?,
            patterns,
        })
    }

    /// 规范化候选文本
    ///
    /// 压缩空白为单个空格，剥离 "Question:"、"Q1."、"3." 这类标签前缀。
    pub fn normalize(&self, raw: &str) -> String {
        let collapsed = self.whitespace_re.replace_all(raw, " ");
        let trimmed = collapsed.trim();
        let stripped = self.label_prefix_re.replace(trimmed, "");
        let stripped = self.ordinal_prefix_re.replace(&stripped, "");
        stripped.trim().to_string()
    }

    /// 判断文本是否为面试问题
    ///
    /// 先规范化再判定；对相同输入的调用顺序不敏感。
    pub fn is_question(&self, text: &str) -> bool {
        self.check(&self.normalize(text))
    }

    /// 分类候选文本
    ///
    /// 判定为问题时返回规范化后的文本，否则返回 None。
    /// 扫描器使用此接口，避免规范化两次。
    pub fn classify(&self, raw: &str) -> Option<String> {
        let normalized = self.normalize(raw);
        if self.check(&normalized) {
            Some(normalized)
        } else {
            None
        }
    }

    /// 对规范化后的文本执行判定规则
    fn check(&self, text: &str) -> bool {
        let char_count = text.chars().count();
        if !(10..=1000).contains(&char_count) {
            return false;
        }

        let has_letters = text.chars().any(|c| c.is_ascii_alphabetic());
        let purely_numeric = !text.is_empty() && text.chars().all(|c| c.is_ascii_digit());
        if !has_letters || purely_numeric {
            return false;
        }

        let lower = text.to_lowercase();
        let has_indicator = QUESTION_INDICATORS
            .iter()
            .any(|indicator| lower.contains(indicator));
        let has_pattern = self.patterns.iter().any(|p| p.is_match(text));

        has_indicator || has_pattern
    }
}
