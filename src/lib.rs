//! Anima - 人格对话记忆服务
//!
//! 用一个人的历史聊天记录做上下文学习，让大语言模型以稳定的"人格"口吻
//! 回复新消息。核心是对话记忆管线：聊天记录归一化 → 记忆存储 → 上下文组装。

pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;
