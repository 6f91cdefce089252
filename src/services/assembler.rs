//! 上下文组装服务
//!
//! 从只读的 `MemoryStore` 里按"最近优先"选出一段历史，连同新消息渲染成
//! 单个提示词文本。选择是原子的：一条消息要么完整放入要么完整排除，
//! 绝不从中间截断历史消息；唯一允许截断的是新消息本身（带显式标记）。

use crate::config::config::{ContextConfig, PersonaConfig};
use crate::models::context::{ContextWindow, SizeBudget};
use crate::models::message::{MemoryStore, Message, Speaker};

/// 大小度量
///
/// 字符数还是 Token 估算由配置决定，组装逻辑不感知具体度量方式。
pub trait SizeMetric: Send + Sync {
    /// 度量一段文本的大小
    fn measure(&self, text: &str) -> usize;
}

/// 字符数度量
pub struct CharCountMetric;

impl SizeMetric for CharCountMetric {
    fn measure(&self, text: &str) -> usize {
        text.chars().count()
    }
}

/// Token 估算度量（粗略估算）
pub struct TokenEstimateMetric;

impl SizeMetric for TokenEstimateMetric {
    fn measure(&self, text: &str) -> usize {
        text.len() / 4
    }
}

/// 创建大小度量
pub fn create_size_metric(kind: &str) -> Box<dyn SizeMetric> {
    match kind {
        "tokens" => Box::new(TokenEstimateMetric),
        "chars" | _ => Box::new(CharCountMetric),
    }
}

/// 上下文组装器
pub struct ContextAssembler {
    persona_label: String,
    other_label: String,
    metric: Box<dyn SizeMetric>,
    truncation_marker: String,
}

impl ContextAssembler {
    /// 创建新组装器
    pub fn new(
        persona_label: &str,
        other_label: &str,
        metric: Box<dyn SizeMetric>,
        truncation_marker: &str,
    ) -> Self {
        Self {
            persona_label: persona_label.to_string(),
            other_label: other_label.to_string(),
            metric,
            truncation_marker: truncation_marker.to_string(),
        }
    }

    /// 按配置创建组装器
    pub fn from_config(persona: &PersonaConfig, context: &ContextConfig) -> Self {
        Self::new(
            &persona.name,
            &persona.user_label,
            create_size_metric(&context.size_metric),
            &context.truncation_marker,
        )
    }

    /// 组装上下文窗口
    ///
    /// 对非空存储永不失败；空存储退化为只含新消息的零样本窗口。
    pub fn assemble(
        &self,
        store: &MemoryStore,
        new_utterance: &str,
        budget: &SizeBudget,
    ) -> ContextWindow {
        let history_budget = budget.history_budget();
        let mut selected: Vec<&Message> = Vec::new();
        let mut history_size = 0usize;

        // 从最近往回走，第一条放不下的消息即停止
        for message in store.messages().iter().rev() {
            let rendered = self.render_turn(message.speaker, &message.text);
            let cost = self.metric.measure(&rendered) + 1; // 轮次间换行
            if history_size + cost > history_budget {
                break;
            }
            history_size += cost;
            selected.push(message);
        }

        // 倒序选出的子集恢复为时间顺序
        selected.reverse();

        // 新消息占用剩余预算，至少有保留份额可用
        let utterance_budget = budget.max_context_size.saturating_sub(history_size);
        let rendered_utterance = self.render_turn(Speaker::Other, new_utterance);
        let (final_utterance, truncated) =
            if self.metric.measure(&rendered_utterance) > utterance_budget {
                (
                    self.truncate_utterance(new_utterance, utterance_budget),
                    true,
                )
            } else {
                (rendered_utterance, false)
            };

        let mut lines: Vec<String> = selected
            .iter()
            .map(|m| self.render_turn(m.speaker, &m.text))
            .collect();
        lines.push(final_utterance);
        let prompt = lines.join("\n");
        let size = self.metric.measure(&prompt);

        ContextWindow {
            messages: selected.into_iter().cloned().collect(),
            prompt,
            size,
            truncated,
        }
    }

    /// 渲染单个轮次
    fn render_turn(&self, speaker: Speaker, text: &str) -> String {
        let label = match speaker {
            Speaker::Persona => &self.persona_label,
            Speaker::Other => &self.other_label,
        };
        format!("{}: {}", label, text)
    }

    /// 从尾部截断新消息并追加显式标记
    fn truncate_utterance(&self, utterance: &str, utterance_budget: usize) -> String {
        let prefix = format!("{}: ", self.other_label);
        let overhead = self.metric.measure(&prefix) + self.metric.measure(&self.truncation_marker);
        let allowed = utterance_budget.saturating_sub(overhead);

        let mut kept = String::new();
        for ch in utterance.chars() {
            kept.push(ch);
            if self.metric.measure(&kept) > allowed {
                kept.pop();
                break;
            }
        }

        format!("{}{}{}", prefix, kept, self.truncation_marker)
    }
}
