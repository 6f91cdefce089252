//! 聊天 DTO
//!
//! 定义聊天相关的请求和响应数据结构。

use serde::{Deserialize, Serialize};

/// 聊天请求
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ChatRequest {
    /// 用户发来的新消息
    pub message: String,
}

/// 聊天响应
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// 人格的回复
    pub reply: String,
    /// 窗口内的历史轮次数
    pub context_turns: usize,
    /// 新消息是否被截断
    pub truncated: bool,
    /// 使用的模型
    pub model: String,
}
