//! Memory Routes
//!
//! 定义记忆存储相关的 API 路由。

use crate::api::handlers::memory_handler::*;
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::app_state::AppState;

/// 创建记忆路由器
pub fn create_memory_router() -> Router<AppState> {
    Router::new()
        .route("/memory/import", post(import_transcript))
        .route("/memory", get(get_stats))
        .route("/memory/messages", get(list_messages))
}
