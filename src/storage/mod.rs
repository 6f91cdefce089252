//! 存储模块
//!
//! 记忆存储的持久化表示：单个 JSON 文档，整体覆盖，从不部分修补。

pub mod memory_file;

pub use memory_file::{JsonFileRepository, MemoryStoreRepository, create_memory_repository};
