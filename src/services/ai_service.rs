//! AI 回答服务 - 业务能力层
//!
//! 只负责"一个问题 → 一段口语化回答"：
//! 凭据检查 → 缓存命中 → 后端调用 → 缓存写入。
//! 不关心问题从哪来、答案如何展示。
//!
//! ## 技术栈
//! - OpenAI 协议走 `async-openai`（兼容自定义端点）
//! - Gemini 协议走 `reqwest` 原生 JSON POST
//! - 并发的重复请求不做合并，由调用方保证可见的请求只有一个

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, BackendError, ConfigError};
use crate::models::{AiProvider, DetectionContext, Settings};
use crate::services::storage::StorageManager;

/// OpenAI 的系统消息
const SYSTEM_PROMPT: &str = "You are an expert interview coach helping someone \
answer interview questions professionally and concisely.";

/// AI 回答服务
///
/// 职责：
/// - 生成面试问题的回答（带缓存）
/// - 校验 API Key 可达性
/// - 不持有页面资源，不出现检测 / 面板状态
pub struct AiService {
    http: reqwest::Client,
    storage: Arc<StorageManager>,
    openai_api_base: String,
    gemini_api_base: String,
}

impl AiService {
    /// 创建新的 AI 回答服务
    pub fn new(config: &Config, storage: Arc<StorageManager>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            http,
            storage,
            openai_api_base: config.openai_api_base.clone(),
            gemini_api_base: config.gemini_api_base.clone(),
        }
    }

    /// 生成回答
    ///
    /// 流程：凭据检查 → 缓存查询 → 按配置的提供方调用后端 →
    /// 写入缓存（顺带清理过期条目）→ 返回文本。
    ///
    /// # 参数
    /// - `question`: 规范化后的问题文本
    /// - `context`: 检测上下文（职位 / 公司提示会进入提示词）
    pub async fn generate_answer(
        &self,
        question: &str,
        context: &DetectionContext,
    ) -> AppResult<String> {
        let settings = self.storage.get_settings().await;

        if settings.api_key.is_empty() {
            return Err(ConfigError::MissingApiKey.into());
        }

        // 先查缓存，命中则零网络调用
        if settings.cache_enabled {
            if let Some(cached) = self
                .storage
                .get_cached_response(question, settings.cache_expiry_hours)
                .await
            {
                info!("✓ 缓存命中，直接返回");
                return Ok(cached);
            }
        }

        let prompt = build_prompt(question, context, &settings.response_language);
        debug!("提示词长度: {} 字符", prompt.chars().count());

        let answer = match settings.ai_provider {
            AiProvider::OpenAi => self.generate_with_openai(&prompt, &settings).await?,
            AiProvider::Gemini => self.generate_with_gemini(&prompt, &settings).await?,
        };

        info!(
            "✓ {} 生成回答成功 ({} 字符)",
            settings.ai_provider.name(),
            answer.chars().count()
        );

        if settings.cache_enabled {
            self.storage
                .cache_response(question, &answer, settings.cache_expiry_hours)
                .await;
        }

        Ok(answer)
    }

    /// 调用 OpenAI（chat-completion 协议）
    async fn generate_with_openai(&self, prompt: &str, settings: &Settings) -> AppResult<String> {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&settings.api_key)
            .with_api_base(&self.openai_api_base);
        let client = Client::with_config(openai_config);

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(SYSTEM_PROMPT)
            .build()
            .map_err(|e| AppError::Other(e.to_string()))?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| AppError::Other(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model("gpt-3.5-turbo")
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            // 按词数粗略换算 token 上限
            .max_tokens(settings.max_response_length * 2)
            .temperature(0.7)
            .build()
            .map_err(|e| AppError::Other(e.to_string()))?;

        let response = client.chat().create(request).await.map_err(|e| {
            warn!("OpenAI API 调用失败: {}", e);
            BackendError::Api {
                provider: "OpenAI",
                message: e.to_string(),
            }
        })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or(BackendError::EmptyContent {
                provider: "OpenAI",
            })?;

        Ok(content.trim().to_string())
    }

    /// 调用 Gemini（generate-content 协议）
    async fn generate_with_gemini(&self, prompt: &str, settings: &Settings) -> AppResult<String> {
        let url = format!("{}/models/gemini-pro:generateContent", self.gemini_api_base);

        let body = json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "temperature": 0.7,
                "maxOutputTokens": settings.max_response_length * 2
            }
        });

        let response = self
            .http
            .post(&url)
            .query(&[("key", settings.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Transport {
                provider: "Gemini",
                source: e,
            })?;

        let status = response.status();
        let payload: Value = response.json().await.map_err(|e| BackendError::Transport {
            provider: "Gemini",
            source: e,
        })?;

        if !status.is_success() {
            let message = payload
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or(status.canonical_reason().unwrap_or("请求失败"))
                .to_string();
            warn!("Gemini API 返回错误: {}", message);
            return Err(BackendError::Api {
                provider: "Gemini",
                message,
            }
            .into());
        }

        let text = payload
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("text"))
            .and_then(|t| t.as_str())
            .ok_or(BackendError::EmptyContent {
                provider: "Gemini",
            })?;

        Ok(text.trim().to_string())
    }

    /// 校验 API Key 可达性
    ///
    /// 轻量的 list-models 探测，只产生一次网络往返，无其他副作用。
    pub async fn validate_api_key(&self, provider: AiProvider, api_key: &str) -> bool {
        let result = match provider {
            AiProvider::OpenAi => {
                self.http
                    .get(format!("{}/models", self.openai_api_base))
                    .bearer_auth(api_key)
                    .send()
                    .await
            }
            AiProvider::Gemini => {
                self.http
                    .get(format!("{}/models", self.gemini_api_base))
                    .query(&[("key", api_key)])
                    .send()
                    .await
            }
        };

        match result {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("{} API Key 校验失败: {}", provider.name(), e);
                false
            }
        }
    }
}

/// 构建面试回答的提示词
///
/// 包含输出语言指令、口语时长目标、回答结构指导，
/// 以及上下文中存在的职位 / 公司信息。
fn build_prompt(question: &str, context: &DetectionContext, language: &str) -> String {
    let language_instruction = if language == "id" {
        "Respond in Indonesian (Bahasa Indonesia)"
    } else {
        "Respond in English"
    };

    let mut prompt = format!(
        r#"{language_instruction}.

You are helping someone answer an interview question. Provide a concise, professional, and compelling answer.

Interview Question: "{question}"

Guidelines:
- Keep the answer between 60-90 seconds when spoken aloud
- Be specific and use examples when possible
- Show enthusiasm and confidence
- Structure: Brief intro + main points + conclusion
- Avoid generic answers, make it personal and authentic"#
    );

    if let Some(job_title) = &context.job_title {
        prompt.push_str(&format!("\n- Job Position: {}", job_title));
    }
    if let Some(company) = &context.company {
        prompt.push_str(&format!("\n- Company: {}", company));
    }

    prompt.push_str("\n\nProvide only the answer, no additional commentary:");

    prompt
}
