//! 聊天记录归一化服务
//!
//! 把导出的半结构化聊天文本解析为干净、按时间排序、去重后的 `MemoryStore`：
//!
//! 1. 按表头模式切分逻辑记录，不匹配表头的行并入上一条记录的正文（保留内部换行）
//! 2. 按配置的人格名解析说话者，按配置的格式解析时间（失败的记录跳过并计数）
//! 3. 纯占位符消息（图片、语音、系统通知等）整条丢弃，正文内嵌的占位符原样保留
//! 4. 折叠多余空白、脱敏、按原始顺序分配序号
//! 5. 按 (时间, 正文, 说话者) 去重，保留最早出现的一条
//! 6. 按 (时间, 序号) 稳定排序

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::config::config::{PersonaConfig, TranscriptConfig};
use crate::error::{AppError, Result};
use crate::models::message::{MemoryStore, Message, Speaker};
use crate::models::record::RawRecord;

/// 导入报告
///
/// 让操作者在依赖存储做生成之前，能判断数据质量。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportReport {
    /// 成功解析的记录数（去重前）
    pub parsed: usize,
    /// 跳过的记录数（时间无法解析或清洗后正文为空）
    pub skipped: usize,
    /// 整条丢弃的纯占位符/系统通知数
    pub placeholders_dropped: usize,
    /// 去重时丢弃的重复消息数
    pub duplicates_dropped: usize,
}

impl ImportReport {
    /// 最终进入存储的消息数
    pub fn stored(&self) -> usize {
        self.parsed - self.duplicates_dropped
    }

    /// 识别出的记录总数
    pub fn total_records(&self) -> usize {
        self.parsed + self.skipped + self.placeholders_dropped
    }
}

/// 归一化结果
#[derive(Debug, Clone)]
pub struct NormalizedTranscript {
    /// 构建好的记忆存储
    pub store: MemoryStore,
    /// 导入报告
    pub report: ImportReport,
}

/// 聊天记录归一化器
///
/// 所有配置在构建时固化，`normalize` 是入参的纯函数，可以并发使用。
pub struct TranscriptNormalizer {
    header_re: Regex,
    timestamp_format: String,
    placeholder_patterns: Vec<String>,
    system_notice_res: Vec<Regex>,
    persona_labels: HashSet<String>,
    mask_phone_numbers: bool,
    phone_re: Regex,
}

impl TranscriptNormalizer {
    /// 根据解析配置和人格配置创建归一化器
    pub fn new(transcript: &TranscriptConfig, persona: &PersonaConfig) -> Result<Self> {
        let header_re = Regex::new(&transcript.header_pattern)?;
        for group in ["sender", "time", "content"] {
            if !header_re.capture_names().flatten().any(|name| name == group) {
                return Err(AppError::Config(format!(
                    "记录表头正则缺少命名分组 {}",
                    group
                )));
            }
        }

        let mut system_notice_res = Vec::with_capacity(transcript.system_notice_patterns.len());
        for pattern in &transcript.system_notice_patterns {
            system_notice_res.push(Regex::new(pattern)?);
        }

        let mut persona_labels = HashSet::new();
        persona_labels.insert(persona.name.trim().to_lowercase());
        for alias in &persona.aliases {
            persona_labels.insert(alias.trim().to_lowercase());
        }

        Ok(Self {
            header_re,
            timestamp_format: transcript.timestamp_format.clone(),
            placeholder_patterns: transcript.placeholder_patterns.clone(),
            system_notice_res,
            persona_labels,
            mask_phone_numbers: transcript.mask_phone_numbers,
            phone_re: Regex::new(r"\b1\d{10}\b")?,
        })
    }

    /// 归一化一份完整的导出文本
    ///
    /// 只有在非空输入中一条记录都识别不出来时才算致命错误；
    /// 单条记录解析失败会被跳过并计入报告。
    pub fn normalize(&self, raw: &str) -> Result<NormalizedTranscript> {
        let records = self.split_records(raw);

        if records.is_empty() {
            if raw.lines().any(|line| !line.trim().is_empty()) {
                return Err(AppError::MalformedTranscript(
                    "没有任何一行匹配记录表头模式".to_string(),
                ));
            }
            // 空白文本是合法的空存储
            return Ok(NormalizedTranscript {
                store: MemoryStore::new(),
                report: ImportReport::default(),
            });
        }

        let mut report = ImportReport::default();
        let mut messages: Vec<Message> = Vec::with_capacity(records.len());
        let mut next_sequence_id: u64 = 0;

        for record in records {
            let timestamp = match chrono::NaiveDateTime::parse_from_str(
                record.timestamp_text.trim(),
                &self.timestamp_format,
            ) {
                Ok(dt) => dt.and_utc(),
                Err(e) => {
                    warn!(
                        line = record.line_number,
                        time = %record.timestamp_text,
                        "时间无法解析，跳过该记录: {}",
                        e
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            let speaker = self.resolve_speaker(&record.sender);
            let text = self.clean_text(&record.body);

            if text.is_empty() {
                debug!(line = record.line_number, "清洗后正文为空，跳过该记录");
                report.skipped += 1;
                continue;
            }

            if self.is_droppable(&text) {
                report.placeholders_dropped += 1;
                continue;
            }

            messages.push(Message::new(speaker, timestamp, &text, next_sequence_id));
            next_sequence_id += 1;
            report.parsed += 1;
        }

        // 按 (时间, 正文, 说话者) 去重，迭代顺序即原始顺序，保留序号最小的一条
        let mut seen = HashSet::with_capacity(messages.len());
        let before = messages.len();
        messages.retain(|m| seen.insert(m.dedup_key()));
        report.duplicates_dropped = before - messages.len();

        // 序号已编码原始顺序，(时间, 序号) 排序对平局保持稳定
        messages.sort_by_key(|m| (m.timestamp, m.sequence_id));

        Ok(NormalizedTranscript {
            store: MemoryStore::from_messages(messages),
            report,
        })
    }

    /// 把原始文本切分为逻辑记录
    fn split_records(&self, raw: &str) -> Vec<RawRecord> {
        let mut records: Vec<RawRecord> = Vec::new();

        for (idx, line) in raw.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            if let Some(caps) = self.header_re.captures(line) {
                records.push(RawRecord::new(
                    caps["sender"].trim(),
                    caps["time"].trim(),
                    &caps["content"],
                    idx + 1,
                ));
            } else if let Some(current) = records.last_mut() {
                // 不匹配表头的行是上一条消息的续行
                current.append_continuation(line.trim());
            }
            // 第一条表头之前的行无从归属，忽略
        }

        records
    }

    /// 按配置的人格名与别名解析说话者，大小写不敏感，未匹配一律算对方
    fn resolve_speaker(&self, sender: &str) -> Speaker {
        if self.persona_labels.contains(&sender.trim().to_lowercase()) {
            Speaker::Persona
        } else {
            Speaker::Other
        }
    }

    /// 清洗正文：脱敏、逐行折叠空白、去掉空行，保留内部换行
    fn clean_text(&self, body: &str) -> String {
        let masked = if self.mask_phone_numbers {
            self.phone_re.replace_all(body, "[PHONE]").into_owned()
        } else {
            body.to_string()
        };

        masked
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 是否应整条丢弃：系统通知，或去掉占位符后不剩任何文本
    ///
    /// 正文内嵌的占位符不触发丢弃，作为内联标记保留。
    fn is_droppable(&self, text: &str) -> bool {
        if self.system_notice_res.iter().any(|re| re.is_match(text)) {
            return true;
        }

        let mut stripped = text.to_string();
        for pattern in &self.placeholder_patterns {
            stripped = stripped.replace(pattern.as_str(), "");
        }
        stripped.split_whitespace().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config::AppConfig;
    use rstest::rstest;

    fn normalizer() -> TranscriptNormalizer {
        let config = AppConfig::development();
        TranscriptNormalizer::new(&config.transcript, &config.persona).unwrap()
    }

    #[test]
    fn test_three_records_with_continuation() {
        let raw = "\
她(2024-01-03 21:15:00): 还没呢，刚下班\n\
我(2024-01-03 21:16:00): 那我们要不要去吃火锅\n\
就上次那家\n\
她(2024-01-03 21:17:00): 好呀好呀~\n";

        let result = normalizer().normalize(raw).unwrap();
        assert_eq!(result.store.len(), 3);
        assert_eq!(result.report.parsed, 3);
        assert_eq!(result.report.skipped, 0);

        // 第二条消息包含续行，内部换行保留
        let second = &result.store.messages()[1];
        assert_eq!(second.text, "那我们要不要去吃火锅\n就上次那家");
        assert_eq!(second.speaker, Speaker::Other);
    }

    #[test]
    fn test_duplicate_messages_are_dropped() {
        let raw = "\
她(2024-01-03 21:15:00): 晚安\n\
她(2024-01-03 21:15:00): 晚安\n";

        let result = normalizer().normalize(raw).unwrap();
        assert_eq!(result.store.len(), 1);
        assert_eq!(result.report.parsed, 2);
        assert_eq!(result.report.duplicates_dropped, 1);
        assert_eq!(result.store.messages()[0].sequence_id, 0);
    }

    #[test]
    fn test_store_is_sorted_by_timestamp() {
        let raw = "\
她(2024-01-03 22:00:00): 晚安\n\
我(2024-01-03 21:00:00): 睡了吗\n\
她(2024-01-03 21:30:00): 还没~\n";

        let result = normalizer().normalize(raw).unwrap();
        assert!(result.store.is_chronologically_ordered());
        assert_eq!(result.store.messages()[0].text, "睡了吗");
        assert_eq!(result.store.last().unwrap().text, "晚安");
    }

    #[test]
    fn test_unparseable_timestamp_is_recoverable_skip() {
        let raw = "\
她(昨天晚上): 这条时间坏了\n\
她(2024-01-03 21:15:00): 这条是好的\n";

        let result = normalizer().normalize(raw).unwrap();
        assert_eq!(result.store.len(), 1);
        assert_eq!(result.report.parsed, 1);
        assert_eq!(result.report.skipped, 1);
    }

    #[test]
    fn test_pure_placeholder_dropped_embedded_kept() {
        let raw = "\
她(2024-01-03 21:15:00): [图片]\n\
她(2024-01-03 21:16:00): 你看这个[图片]好好笑\n";

        let result = normalizer().normalize(raw).unwrap();
        assert_eq!(result.store.len(), 1);
        assert_eq!(result.report.placeholders_dropped, 1);
        assert_eq!(result.store.messages()[0].text, "你看这个[图片]好好笑");
    }

    #[test]
    fn test_system_notice_dropped() {
        let raw = "\
系统(2024-01-03 21:15:00): 你邀请小王加入了群聊\n\
她(2024-01-03 21:16:00): 人齐了！\n";

        let result = normalizer().normalize(raw).unwrap();
        assert_eq!(result.store.len(), 1);
        assert_eq!(result.report.placeholders_dropped, 1);
    }

    #[test]
    fn test_malformed_transcript_is_fatal() {
        let raw = "这份导出完全不符合格式\n也没有一行能解析\n";
        let err = normalizer().normalize(raw).unwrap_err();
        assert!(matches!(err, AppError::MalformedTranscript(_)));
    }

    #[rstest]
    #[case("")]
    #[case("\n\n   \n")]
    fn test_blank_transcript_is_valid_empty_store(#[case] raw: &str) {
        let result = normalizer().normalize(raw).unwrap();
        assert!(result.store.is_empty());
        assert_eq!(result.report.total_records(), 0);
    }

    #[test]
    fn test_phone_number_masked() {
        let raw = "她(2024-01-03 21:15:00): 我新号码 13812345678 记一下\n";
        let result = normalizer().normalize(raw).unwrap();
        assert_eq!(result.store.messages()[0].text, "我新号码 [PHONE] 记一下");
    }

    #[test]
    fn test_alias_resolves_to_persona() {
        let mut config = AppConfig::development();
        config.persona.aliases = vec!["宝宝".into()];
        let normalizer = TranscriptNormalizer::new(&config.transcript, &config.persona).unwrap();

        let raw = "宝宝(2024-01-03 21:15:00): 在呢\n";
        let result = normalizer.normalize(raw).unwrap();
        assert_eq!(result.store.messages()[0].speaker, Speaker::Persona);
    }

    #[test]
    fn test_whitespace_collapsed_per_line() {
        let raw = "她(2024-01-03 21:15:00): 今天\t\t好   累\n";
        let result = normalizer().normalize(raw).unwrap();
        assert_eq!(result.store.messages()[0].text, "今天 好 累");
    }

    #[test]
    fn test_configurable_header_pattern() {
        // 方括号风格的导出格式：[时间] 发送者: 内容
        let mut config = AppConfig::development();
        config.transcript.header_pattern =
            r"^\[(?P<time>.*?)\]\s*(?P<sender>.*?):\s*(?P<content>.*)$".into();
        let normalizer = TranscriptNormalizer::new(&config.transcript, &config.persona).unwrap();

        let raw = "[2024-01-03 21:15:00] 她: 换个格式也认识我吗\n";
        let result = normalizer.normalize(raw).unwrap();
        assert_eq!(result.store.len(), 1);
        assert_eq!(result.store.messages()[0].speaker, Speaker::Persona);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = "\
她(2024-01-03 21:15:00): 还没呢，刚下班\n\
我(2024-01-03 21:16:00): 那吃火锅？\n";

        let n = normalizer();
        let a = serde_json::to_vec(&n.normalize(raw).unwrap().store).unwrap();
        let b = serde_json::to_vec(&n.normalize(raw).unwrap().store).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_reimported_duplicate_transcript_merges_clean() {
        let raw = "\
她(2024-01-03 21:15:00): 还没呢\n\
我(2024-01-03 21:16:00): 那吃火锅？\n";
        let doubled = format!("{}{}", raw, raw);

        let result = normalizer().normalize(&doubled).unwrap();
        assert_eq!(result.store.len(), 2);
        assert_eq!(result.report.duplicates_dropped, 2);

        // 去重键不重复
        let mut keys = HashSet::new();
        for m in result.store.messages() {
            assert!(keys.insert(m.dedup_key()));
        }
    }
}
