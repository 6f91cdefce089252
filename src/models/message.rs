//! 消息数据模型
//!
//! `Message` 是记忆的最小单元，`MemoryStore` 是按时间排序、去重后的消息序列，
//! 由归一化器一次性构建，构建完成后只读。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 说话者
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    /// 被模仿的人格本人
    #[serde(rename = "persona")]
    Persona,

    /// 对话中的另一方
    #[serde(rename = "other")]
    Other,
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Speaker::Persona => write!(f, "persona"),
            Speaker::Other => write!(f, "other"),
        }
    }
}

/// 归一化后的消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// 说话者
    pub speaker: Speaker,

    /// 消息时间（存储内按此字段非递减排序）
    pub timestamp: DateTime<Utc>,

    /// 归一化后的正文（续行已合并，内部换行保留）
    pub text: String,

    /// 在原始聊天记录中的序号，排序平局时的次要键
    pub sequence_id: u64,
}

impl Message {
    /// 创建新消息
    pub fn new(speaker: Speaker, timestamp: DateTime<Utc>, text: &str, sequence_id: u64) -> Self {
        Self {
            speaker,
            timestamp,
            text: text.to_string(),
            sequence_id,
        }
    }

    /// 去重键：时间 + 正文 + 说话者
    pub fn dedup_key(&self) -> (DateTime<Utc>, String, Speaker) {
        (self.timestamp, self.text.clone(), self.speaker)
    }

    /// 获取内容长度
    pub fn content_length(&self) -> usize {
        self.text.len()
    }

    /// 估算 Token 数量（粗略估算）
    pub fn estimated_tokens(&self) -> u64 {
        (self.text.len() / 4) as u64
    }
}

/// 记忆存储
///
/// 持久化时序列化为单个 JSON 文档（消息数组），重建时整体覆盖。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryStore {
    messages: Vec<Message>,
}

impl MemoryStore {
    /// 创建空存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 从已归一化的消息序列构建存储
    ///
    /// 调用方（归一化器）负责保证序列已排序、已去重。
    pub fn from_messages(messages: Vec<Message>) -> Self {
        debug_assert!(Self::is_sorted(&messages));
        Self { messages }
    }

    /// 消息数量
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// 只读访问全部消息
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 最近一条消息
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// 校验 (timestamp, sequence_id) 非递减
    pub fn is_chronologically_ordered(&self) -> bool {
        Self::is_sorted(&self.messages)
    }

    /// 统计信息
    pub fn stats(&self) -> StoreStats {
        let persona_count = self
            .messages
            .iter()
            .filter(|m| m.speaker == Speaker::Persona)
            .count();

        StoreStats {
            total: self.messages.len(),
            persona_count,
            other_count: self.messages.len() - persona_count,
            earliest: self.messages.first().map(|m| m.timestamp),
            latest: self.messages.last().map(|m| m.timestamp),
        }
    }

    fn is_sorted(messages: &[Message]) -> bool {
        messages
            .windows(2)
            .all(|w| (w[0].timestamp, w[0].sequence_id) <= (w[1].timestamp, w[1].sequence_id))
    }
}

/// 存储统计信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    /// 总消息数
    pub total: usize,
    /// 人格本人的消息数
    pub persona_count: usize,
    /// 对方的消息数
    pub other_count: usize,
    /// 最早消息时间
    pub earliest: Option<DateTime<Utc>>,
    /// 最晚消息时间
    pub latest: Option<DateTime<Utc>>,
}
