use crate::observability::AppMetrics;
use crate::services::chat::ChatService;
use crate::services::memory::MemoryService;
use std::sync::Arc;

/// Application state containing all shared services
#[derive(Clone)]
pub struct AppState {
    /// Memory service for transcript import and store access
    pub memory_service: Arc<dyn MemoryService>,
    /// Chat service for persona replies
    pub chat_service: Arc<dyn ChatService>,
    /// Shared application metrics
    pub metrics: Arc<AppMetrics>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("memory_service", &"Arc<dyn MemoryService>")
            .field("chat_service", &"Arc<dyn ChatService>")
            .field("metrics", &"Arc<AppMetrics>")
            .finish()
    }
}

impl AppState {
    /// Create new application state
    pub fn new(
        memory_service: Arc<dyn MemoryService>,
        chat_service: Arc<dyn ChatService>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            memory_service,
            chat_service,
            metrics,
        }
    }
}
