//! 聊天服务
//!
//! 把一次对话请求串起来：取存储快照 → 组装上下文窗口 → 拼接角色扮演前导
//! 和结尾补全提示 → 调用生成模型。模型返回的文本原样透传。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::config::{ContextConfig, PersonaConfig};
use crate::error::Result;
use crate::llm::GenerationModel;
use crate::models::context::{ContextWindow, SizeBudget};
use crate::services::assembler::ContextAssembler;
use crate::services::memory::MemoryService;

/// 一次聊天的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    /// 模型生成的回复
    pub reply: String,
    /// 窗口内包含的历史轮次数
    pub context_turns: usize,
    /// 新消息是否被截断（截断会降低模仿效果，调用方应提示用户）
    pub truncated: bool,
    /// 提示词大小（按配置的度量方式）
    pub prompt_size: usize,
    /// 使用的模型
    pub model: String,
}

/// 聊天服务 trait
#[async_trait]
pub trait ChatService: Send + Sync {
    /// 以配置的人格回复一条新消息
    async fn chat(&self, user_input: &str) -> Result<ChatReply>;
}

/// 聊天服务实现
pub struct ChatServiceImpl {
    memory_service: Arc<dyn MemoryService>,
    model: Arc<dyn GenerationModel>,
    assembler: ContextAssembler,
    budget: SizeBudget,
    persona_name: String,
    user_label: String,
    persona_description: String,
}

impl ChatServiceImpl {
    /// 创建新的服务实例
    pub fn new(
        memory_service: Arc<dyn MemoryService>,
        model: Arc<dyn GenerationModel>,
        persona: &PersonaConfig,
        context: &ContextConfig,
    ) -> Self {
        Self {
            memory_service,
            model,
            assembler: ContextAssembler::from_config(persona, context),
            budget: SizeBudget::new(context.max_context_size, context.utterance_reserve),
            persona_name: persona.name.clone(),
            user_label: persona.user_label.clone(),
            persona_description: persona.description.clone(),
        }
    }

    /// 拼接完整提示词：角色扮演前导 + 上下文窗口 + 补全提示
    fn build_prompt(&self, window: &ContextWindow) -> String {
        let mut lines = Vec::new();
        lines.push(format!(
            "你现在需要进行角色扮演。你的名字是{}，你正在微信上和{}聊天。",
            self.persona_name, self.user_label
        ));
        if !self.persona_description.is_empty() {
            lines.push(format!("【性格特征】：{}", self.persona_description));
        }
        lines.push(format!(
            "请严格模仿下面聊天记录里{}的语气回复最后一条消息。不要像个机器人，要生活化。",
            self.persona_name
        ));
        lines.push("【聊天记录】：".to_string());
        lines.push(window.prompt.clone());
        lines.push(format!("{}:", self.persona_name));
        lines.join("\n")
    }
}

#[async_trait]
impl ChatService for ChatServiceImpl {
    async fn chat(&self, user_input: &str) -> Result<ChatReply> {
        let store = self.memory_service.snapshot().await;
        let window = self.assembler.assemble(&store, user_input, &self.budget);

        if window.truncated {
            warn!("新消息超出预算被截断，人格模仿效果可能下降");
        }
        debug!(
            turns = window.turn_count(),
            size = window.size,
            "上下文窗口已组装"
        );

        let prompt = self.build_prompt(&window);
        let reply = self.model.generate(&prompt).await?;

        Ok(ChatReply {
            reply,
            context_turns: window.turn_count(),
            truncated: window.truncated,
            prompt_size: window.size,
            model: self.model.model_name().to_string(),
        })
    }
}

/// 创建聊天服务
pub fn create_chat_service(
    memory_service: Arc<dyn MemoryService>,
    model: Arc<dyn GenerationModel>,
    persona: &PersonaConfig,
    context: &ContextConfig,
) -> Box<dyn ChatService> {
    Box::new(ChatServiceImpl::new(memory_service, model, persona, context))
}
