//! 记忆 DTO
//!
//! 定义记忆导入和查询相关的请求和响应数据结构。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::message::{Message, StoreStats};
use crate::services::normalizer::ImportReport;

/// 导入聊天记录请求
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ImportTranscriptRequest {
    /// 导出的原始聊天文本
    pub transcript: String,
}

/// 导入报告响应
#[derive(Debug, Serialize)]
pub struct ImportReportResponse {
    /// 成功解析的记录数
    pub parsed: usize,
    /// 跳过的记录数
    pub skipped: usize,
    /// 丢弃的纯占位符数
    pub placeholders_dropped: usize,
    /// 去重丢弃的消息数
    pub duplicates_dropped: usize,
    /// 最终入库的消息数
    pub stored: usize,
}

impl From<ImportReport> for ImportReportResponse {
    fn from(report: ImportReport) -> Self {
        Self {
            stored: report.stored(),
            parsed: report.parsed,
            skipped: report.skipped,
            placeholders_dropped: report.placeholders_dropped,
            duplicates_dropped: report.duplicates_dropped,
        }
    }
}

/// 存储统计响应
#[derive(Debug, Serialize)]
pub struct StoreStatsResponse {
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

impl From<StoreStats> for StoreStatsResponse {
    fn from(stats: StoreStats) -> Self {
        Self {
            total: stats.total,
            persona_count: stats.persona_count,
            other_count: stats.other_count,
            earliest: stats.earliest,
            latest: stats.latest,
        }
    }
}

/// 消息响应
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// 说话者
    pub speaker: String,
    /// 消息时间
    pub timestamp: DateTime<Utc>,
    /// 正文
    pub text: String,
    /// 序号
    pub sequence_id: u64,
}

/// 消息列表响应
#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    /// 当前页的消息
    pub messages: Vec<MessageResponse>,
    /// 总消息数
    pub total: usize,
    /// 页码
    pub page: usize,
    /// 每页数量
    pub page_size: usize,
}

/// 消息列表查询参数
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ListMessagesParams {
    /// 页码
    pub page: Option<usize>,
    /// 每页数量
    pub page_size: Option<usize>,
}

/// 把消息实体转换为响应
pub fn convert_message_to_response(message: Message) -> MessageResponse {
    MessageResponse {
        speaker: message.speaker.to_string(),
        timestamp: message.timestamp,
        text: message.text,
        sequence_id: message.sequence_id,
    }
}
