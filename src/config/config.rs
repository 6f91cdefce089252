use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// 服务地址
    pub host: String,
    /// 服务端口
    pub port: u16,
    /// 请求超时（秒）
    pub request_timeout: u64,
}

/// 人格配置
///
/// `name` 决定哪个发送者标签算"本人"，其余标签一律归为对方。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PersonaConfig {
    /// 人格显示名（聊天记录中"本人"的发送者标签）
    pub name: String,
    /// 同样映射到本人的别名/昵称列表，大小写不敏感
    pub aliases: Vec<String>,
    /// 对方在提示词中的标签
    pub user_label: String,
    /// 性格描述，拼入角色扮演前导
    pub description: String,
}

/// 聊天记录解析配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TranscriptConfig {
    /// 记录表头的正则，必须包含 sender / time / content 三个命名分组
    pub header_pattern: String,
    /// 时间解析格式（chrono 格式串）
    pub timestamp_format: String,
    /// 非文本占位符列表（纯占位符消息整条丢弃）
    pub placeholder_patterns: Vec<String>,
    /// 系统通知的正则列表（匹配即整条丢弃）
    pub system_notice_patterns: Vec<String>,
    /// 是否把手机号替换为 [PHONE]
    pub mask_phone_numbers: bool,
}

/// 上下文组装配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ContextConfig {
    /// 组装后提示词大小上限
    pub max_context_size: usize,
    /// 为新消息保留的最小份额
    pub utterance_reserve: usize,
    /// 大小度量方式: "chars" 或 "tokens"
    pub size_metric: String,
    /// 新消息被截断时追加的标记
    pub truncation_marker: String,
}

/// 生成模型配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LlmConfig {
    /// 后端类型: "gemini" 或 "echo"
    pub backend: String,
    /// API 密钥
    pub api_key: String,
    /// 模型名称
    pub model_name: String,
    /// API 基础地址
    pub base_url: String,
    /// 采样温度
    pub temperature: f32,
    /// 输出 Token 上限
    pub max_output_tokens: u32,
    /// 失败重试次数
    pub max_retries: u32,
    /// 请求超时（秒）
    pub timeout_secs: u64,
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// 记忆存储文件路径（单个 JSON 文档）
    pub memory_file: PathBuf,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 人格配置
    pub persona: PersonaConfig,
    /// 聊天记录解析配置
    pub transcript: TranscriptConfig,
    /// 上下文组装配置
    pub context: ContextConfig,
    /// 生成模型配置
    pub llm: LlmConfig,
    /// 存储配置
    pub storage: StorageConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 应用名称
    pub app_name: String,
    /// 环境
    pub environment: String,
}

impl AppConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 8080,
                request_timeout: 30,
            },
            persona: PersonaConfig {
                name: "她".into(),
                aliases: Vec::new(),
                user_label: "我".into(),
                description: "温柔、有时候有点小调皮，喜欢用波浪号~，不喜欢回太长的字。".into(),
            },
            transcript: TranscriptConfig {
                header_pattern: r"^(?P<sender>[^()]+?)\((?P<time>[^()]+)\):\s?(?P<content>.*)$"
                    .into(),
                timestamp_format: "%Y-%m-%d %H:%M:%S".into(),
                placeholder_patterns: vec![
                    "[图片]".into(),
                    "[视频]".into(),
                    "[语音]".into(),
                    "[表情]".into(),
                    "[文件]".into(),
                    "[image]".into(),
                    "[video]".into(),
                ],
                system_notice_patterns: vec![
                    "加入了群聊".into(),
                    "撤回了一条消息".into(),
                    "以上是打招呼的内容".into(),
                ],
                mask_phone_numbers: true,
            },
            context: ContextConfig {
                max_context_size: 4000,
                utterance_reserve: 400,
                size_metric: "chars".into(),
                truncation_marker: "…[截断]".into(),
            },
            llm: LlmConfig {
                backend: "echo".into(),
                api_key: String::new(),
                model_name: "gemini-2.5-flash".into(),
                base_url: "https://generativelanguage.googleapis.com".into(),
                temperature: 0.7,
                max_output_tokens: 512,
                max_retries: 2,
                timeout_secs: 60,
            },
            storage: StorageConfig {
                memory_file: PathBuf::from("./data/clean_memory.json"),
            },
            logging: LoggingConfig {
                level: "debug".into(),
                structured: false,
            },
            app_name: "anima".into(),
            environment: "development".into(),
        }
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = "production".into();
        config.logging.level = "info".into();
        config.logging.structured = true;
        config.llm.backend = "gemini".into();
        config
    }
}
