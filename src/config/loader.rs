use crate::config::config::AppConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::PathBuf;

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 合并顺序（后者覆盖前者）：
    /// 1. 开发环境默认值
    /// 2. ./config.toml
    /// 3. ANIMA__ 前缀的环境变量
    pub fn load() -> Result<AppConfig, figment::Error> {
        let figment = Figment::from(Serialized::defaults(AppConfig::development()))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("ANIMA__").split("__").global());

        figment.extract()
    }

    /// 从指定路径加载配置
    pub fn load_from(path: PathBuf) -> Result<AppConfig, figment::Error> {
        let figment = Figment::from(Serialized::defaults(AppConfig::development()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("ANIMA__").split("__").global());

        figment.extract()
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        if config.server.port == 0 {
            return Err(ConfigValidationError::InvalidPort);
        }

        if config.persona.name.trim().is_empty() {
            return Err(ConfigValidationError::MissingPersonaName);
        }

        if config.context.max_context_size == 0 {
            return Err(ConfigValidationError::InvalidBudget);
        }

        if config.context.utterance_reserve >= config.context.max_context_size {
            return Err(ConfigValidationError::InvalidBudget);
        }

        let header = regex::Regex::new(&config.transcript.header_pattern)
            .map_err(|e| ConfigValidationError::InvalidHeaderPattern(e.to_string()))?;
        for group in ["sender", "time", "content"] {
            if !header.capture_names().flatten().any(|name| name == group) {
                return Err(ConfigValidationError::InvalidHeaderPattern(format!(
                    "缺少命名分组 {}",
                    group
                )));
            }
        }

        if config.transcript.timestamp_format.trim().is_empty() {
            return Err(ConfigValidationError::MissingTimestampFormat);
        }

        match config.llm.backend.as_str() {
            "gemini" | "echo" => {}
            other => {
                return Err(ConfigValidationError::UnknownLlmBackend(other.to_string()));
            }
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug)]
pub enum ConfigValidationError {
    #[error("服务端口无效，必须大于 0")]
    InvalidPort,

    #[error("人格显示名未配置")]
    MissingPersonaName,

    #[error("上下文预算无效，保留份额必须小于大小上限")]
    InvalidBudget,

    #[error("记录表头正则无效: {0}")]
    InvalidHeaderPattern(String),

    #[error("时间解析格式未配置")]
    MissingTimestampFormat,

    #[error("未知的生成模型后端: {0}")]
    UnknownLlmBackend(String),
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("config.toml")
}

/// 检查配置文件是否存在
pub fn config_exists() -> bool {
    default_config_path().exists()
}
