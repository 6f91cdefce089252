//! 记忆管理服务
//!
//! 管理共享的记忆存储：导入时整体重建并原子替换（内存值与持久化文档都是
//! 写新换旧），读取方拿到的永远是某个完整版本的不可变快照。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::Result;
use crate::models::message::{MemoryStore, Message, StoreStats};
use crate::services::normalizer::{ImportReport, TranscriptNormalizer};
use crate::storage::memory_file::MemoryStoreRepository;

/// 共享的记忆存储
///
/// 读取方克隆内层 `Arc` 得到廉价快照，导入方整体替换内层值，
/// 不会有读取方看到重建到一半的存储。
pub type SharedMemoryStore = Arc<RwLock<Arc<MemoryStore>>>;

/// 消息分页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePage {
    /// 当前页的消息
    pub messages: Vec<Message>,
    /// 总消息数
    pub total: usize,
    /// 页码
    pub page: usize,
    /// 每页数量
    pub page_size: usize,
}

/// 记忆管理服务 trait
#[async_trait]
pub trait MemoryService: Send + Sync {
    /// 从原始导出文本整体重建记忆存储
    async fn import(&self, raw_transcript: &str) -> Result<ImportReport>;

    /// 获取当前存储的不可变快照
    async fn snapshot(&self) -> Arc<MemoryStore>;

    /// 统计信息
    async fn stats(&self) -> StoreStats;

    /// 按时间顺序分页列出消息
    async fn list_messages(&self, page: usize, page_size: usize) -> MessagePage;
}

/// 记忆管理服务实现
pub struct MemoryServiceImpl {
    normalizer: TranscriptNormalizer,
    repository: Arc<dyn MemoryStoreRepository>,
    store: SharedMemoryStore,
}

impl MemoryServiceImpl {
    /// 创建新的服务实例
    pub fn new(
        normalizer: TranscriptNormalizer,
        repository: Arc<dyn MemoryStoreRepository>,
        initial: MemoryStore,
    ) -> Self {
        Self {
            normalizer,
            repository,
            store: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }
}

#[async_trait]
impl MemoryService for MemoryServiceImpl {
    async fn import(&self, raw_transcript: &str) -> Result<ImportReport> {
        let normalized = self.normalizer.normalize(raw_transcript)?;

        // 先持久化，成功后再替换内存中的值；失败时旧存储原样保留
        self.repository.replace(&normalized.store).await?;
        *self.store.write().await = Arc::new(normalized.store);

        info!(
            parsed = normalized.report.parsed,
            skipped = normalized.report.skipped,
            stored = normalized.report.stored(),
            "记忆导入完成"
        );
        Ok(normalized.report)
    }

    async fn snapshot(&self) -> Arc<MemoryStore> {
        self.store.read().await.clone()
    }

    async fn stats(&self) -> StoreStats {
        self.snapshot().await.stats()
    }

    async fn list_messages(&self, page: usize, page_size: usize) -> MessagePage {
        let store = self.snapshot().await;
        let page = page.max(1);
        let page_size = page_size.clamp(1, 500);

        let messages = store
            .messages()
            .iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .cloned()
            .collect();

        MessagePage {
            messages,
            total: store.len(),
            page,
            page_size,
        }
    }
}

/// 创建记忆管理服务
pub fn create_memory_service(
    normalizer: TranscriptNormalizer,
    repository: Arc<dyn MemoryStoreRepository>,
    initial: MemoryStore,
) -> Box<dyn MemoryService> {
    Box::new(MemoryServiceImpl::new(normalizer, repository, initial))
}
