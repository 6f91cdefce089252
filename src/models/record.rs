//! 原始记录模型
//!
//! 导出文本中的一条逻辑记录，仅在归一化过程中短暂存在。

/// 原始记录
///
/// 记录从匹配表头模式的行开始，之后不匹配表头的行都是正文的续行。
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// 原始发送者标签
    pub sender: String,

    /// 未解析的时间文本
    pub timestamp_text: String,

    /// 原始正文（可能跨多个物理行）
    pub body: String,

    /// 表头所在的物理行号（从 1 开始，用于日志）
    pub line_number: usize,
}

impl RawRecord {
    /// 创建新记录
    pub fn new(sender: &str, timestamp_text: &str, body: &str, line_number: usize) -> Self {
        Self {
            sender: sender.to_string(),
            timestamp_text: timestamp_text.to_string(),
            body: body.to_string(),
            line_number,
        }
    }

    /// 追加一条续行，保留内部换行
    pub fn append_continuation(&mut self, line: &str) {
        self.body.push('\n');
        self.body.push_str(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continuation_preserves_newline() {
        let mut record = RawRecord::new("她", "2024-01-01 10:00:00", "第一行", 1);
        record.append_continuation("第二行");
        assert_eq!(record.body, "第一行\n第二行");
    }
}
