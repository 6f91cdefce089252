//! 上下文窗口模型

use serde::{Deserialize, Serialize};

use crate::models::message::Message;

/// 上下文大小预算
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SizeBudget {
    /// 组装后提示词的大小上限
    pub max_context_size: usize,

    /// 为新消息和结尾指令保留的最小份额
    pub utterance_reserve: usize,
}

impl SizeBudget {
    /// 创建新预算
    pub fn new(max_context_size: usize, utterance_reserve: usize) -> Self {
        Self {
            max_context_size,
            utterance_reserve,
        }
    }

    /// 历史消息可用的预算
    pub fn history_budget(&self) -> usize {
        self.max_context_size.saturating_sub(self.utterance_reserve)
    }
}

impl Default for SizeBudget {
    fn default() -> Self {
        Self {
            max_context_size: 4000,
            utterance_reserve: 400,
        }
    }
}

/// 组装好的上下文窗口
///
/// 每次请求重建，从不持久化。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextWindow {
    /// 选中的历史消息（时间顺序）
    pub messages: Vec<Message>,

    /// 渲染后的提示词文本，新消息永远在最后一轮
    pub prompt: String,

    /// 按当前度量方式计算的提示词大小
    pub size: usize,

    /// 新消息是否被截断
    pub truncated: bool,
}

impl ContextWindow {
    /// 窗口内的历史轮次数量
    pub fn turn_count(&self) -> usize {
        self.messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_budget() {
        let budget = SizeBudget::new(120, 40);
        assert_eq!(budget.history_budget(), 80);

        // 保留份额超过总预算时不下溢
        let budget = SizeBudget::new(30, 40);
        assert_eq!(budget.history_budget(), 0);
    }

    #[test]
    fn test_empty_window() {
        let window = ContextWindow {
            messages: vec![],
            prompt: "我: 你好".to_string(),
            size: 5,
            truncated: false,
        };
        assert_eq!(window.turn_count(), 0);
        assert!(!window.truncated);
    }
}
