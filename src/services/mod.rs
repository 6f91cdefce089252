//! 服务模块

pub mod assembler;
pub mod chat;
pub mod memory;
pub mod normalizer;

pub use assembler::{ContextAssembler, SizeMetric, create_size_metric};
pub use chat::{ChatReply, ChatService, create_chat_service};
pub use memory::{MemoryService, MessagePage, SharedMemoryStore, create_memory_service};
pub use normalizer::{ImportReport, NormalizedTranscript, TranscriptNormalizer};
