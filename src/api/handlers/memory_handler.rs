use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

use crate::{
    api::{app_state::AppState, dto::memory_dto::*},
    error::AppError,
};

pub async fn import_transcript(
    State(state): State<AppState>,
    Json(request): Json<ImportTranscriptRequest>,
) -> Result<impl IntoResponse, AppError> {
    debug!(bytes = request.transcript.len(), "Importing transcript");

    if request.transcript.is_empty() {
        return Err(AppError::Validation("聊天记录不能为空".to_string()));
    }

    let report = match state.memory_service.import(&request.transcript).await {
        Ok(report) => report,
        Err(e) => {
            state.metrics.record_error();
            return Err(e);
        }
    };
    state
        .metrics
        .record_import(report.skipped as u64, report.stored());

    Ok((StatusCode::CREATED, Json(ImportReportResponse::from(report))))
}

pub async fn get_stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    debug!("Getting memory store stats");

    let stats = state.memory_service.stats().await;
    Ok(Json(StoreStatsResponse::from(stats)))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Query(params): Query<ListMessagesParams>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Listing memory store messages");

    let page = params.page.unwrap_or(1);
    let page_size = params.page_size.unwrap_or(50);

    let result = state.memory_service.list_messages(page, page_size).await;

    let response = MessageListResponse {
        messages: result
            .messages
            .into_iter()
            .map(convert_message_to_response)
            .collect(),
        total: result.total,
        page: result.page,
        page_size: result.page_size,
    };

    Ok(Json(response))
}
