use axum::{Json, extract::State, response::IntoResponse};
use tracing::debug;

use crate::{
    api::{app_state::AppState, dto::chat_dto::*},
    error::AppError,
};

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Handling chat request");

    if request.message.trim().is_empty() {
        return Err(AppError::Validation("消息不能为空".to_string()));
    }

    let started = std::time::Instant::now();
    match state.chat_service.chat(&request.message).await {
        Ok(reply) => {
            state.metrics.record_chat(started.elapsed().as_millis() as u64);
            Ok(Json(ChatResponse {
                reply: reply.reply,
                context_turns: reply.context_turns,
                truncated: reply.truncated,
                model: reply.model,
            }))
        }
        Err(e) => {
            state.metrics.record_model_failure();
            state.metrics.record_error();
            Err(e)
        }
    }
}
