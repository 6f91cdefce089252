//! 数据模型模块

pub mod context;
pub mod message;
pub mod record;

pub use context::{ContextWindow, SizeBudget};
pub use message::{MemoryStore, Message, Speaker, StoreStats};
pub use record::RawRecord;
