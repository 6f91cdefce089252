//! 记忆存储持久化
//!
//! 存储序列化为单个 JSON 文档。重建时写入临时文件再原子改名覆盖，
//! 永远不做部分修补，避免读到半新半旧的存储。

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;
use crate::models::message::MemoryStore;

/// 记忆存储仓储 trait
#[async_trait]
pub trait MemoryStoreRepository: Send + Sync {
    /// 加载持久化的存储，文件不存在返回 None
    async fn load(&self) -> Result<Option<MemoryStore>>;

    /// 整体替换持久化的存储
    async fn replace(&self, store: &MemoryStore) -> Result<()>;
}

/// JSON 文件仓储实现
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    /// 创建新仓储
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

#[async_trait]
impl MemoryStoreRepository for JsonFileRepository {
    async fn load(&self) -> Result<Option<MemoryStore>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let store: MemoryStore = serde_json::from_str(&content)?;
                debug!(path = %self.path.display(), messages = store.len(), "记忆存储已加载");
                Ok(Some(store))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn replace(&self, store: &MemoryStore) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // 先写临时文件再改名，改名在同一目录内是原子的
        let temp_path = self.temp_path();
        let content = serde_json::to_string_pretty(store)?;
        tokio::fs::write(&temp_path, content).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        debug!(path = %self.path.display(), messages = store.len(), "记忆存储已替换");
        Ok(())
    }
}

/// 创建记忆存储仓储
pub fn create_memory_repository(path: &Path) -> Box<dyn MemoryStoreRepository> {
    Box::new(JsonFileRepository::new(path))
}
