//! 可观测性模块
//!
//! 提供 Prometheus 文本格式指标、结构化日志和健康检查。

use axum::{Json, Router, response::IntoResponse, routing::get};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

// ===== Simple Metrics (using atomics for zero-dep implementation) =====

/// 简单应用指标
#[derive(Clone, Default)]
pub struct AppMetrics {
    pub chat_requests_total: Arc<AtomicU64>,
    pub chat_latency_sum: Arc<AtomicU64>,
    pub model_failures_total: Arc<AtomicU64>,
    pub imports_total: Arc<AtomicU64>,
    pub import_records_skipped_total: Arc<AtomicU64>,
    pub store_messages: Arc<AtomicUsize>,
    pub errors_total: Arc<AtomicU64>,
}

impl AppMetrics {
    /// 记录一次聊天请求
    pub fn record_chat(&self, duration_ms: u64) {
        self.chat_requests_total.fetch_add(1, Ordering::SeqCst);
        self.chat_latency_sum.fetch_add(duration_ms, Ordering::SeqCst);
    }

    /// 记录一次模型调用失败
    pub fn record_model_failure(&self) {
        self.model_failures_total.fetch_add(1, Ordering::SeqCst);
    }

    /// 记录一次导入
    pub fn record_import(&self, skipped: u64, stored: usize) {
        self.imports_total.fetch_add(1, Ordering::SeqCst);
        self.import_records_skipped_total
            .fetch_add(skipped, Ordering::SeqCst);
        self.store_messages.store(stored, Ordering::SeqCst);
    }

    /// 记录错误
    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::SeqCst);
    }

    /// 生成 Prometheus 格式指标
    pub fn gather(&self) -> String {
        format!(
            r#"# HELP chat_requests_total Total chat requests
# TYPE chat_requests_total counter
chat_requests_total {}
# HELP chat_latency_seconds Chat request latency in seconds
# TYPE chat_latency_seconds histogram
chat_latency_seconds_sum {}
chat_latency_seconds_count {}
# HELP model_failures_total Total generation model failures
# TYPE model_failures_total counter
model_failures_total {}
# HELP imports_total Total transcript imports
# TYPE imports_total counter
imports_total {}
# HELP import_records_skipped_total Total records skipped during import
# TYPE import_records_skipped_total counter
import_records_skipped_total {}
# HELP store_messages Messages in the current memory store
# TYPE store_messages gauge
store_messages {}
# HELP errors_total Total errors
# TYPE errors_total counter
errors_total {}
"#,
            self.chat_requests_total.load(Ordering::SeqCst),
            self.chat_latency_sum.load(Ordering::SeqCst) as f64 / 1000.0,
            self.chat_requests_total.load(Ordering::SeqCst),
            self.model_failures_total.load(Ordering::SeqCst),
            self.imports_total.load(Ordering::SeqCst),
            self.import_records_skipped_total.load(Ordering::SeqCst),
            self.store_messages.load(Ordering::SeqCst),
            self.errors_total.load(Ordering::SeqCst),
        )
    }
}

// ===== Health Check =====

/// 健康检查状态
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: f64,
    pub store_messages: usize,
}

/// 应用状态（用于健康检查）
#[derive(Clone)]
pub struct ObservabilityState {
    pub metrics: Arc<AppMetrics>,
    pub start_time: DateTime<Utc>,
    pub version: String,
}

impl ObservabilityState {
    pub fn new(version: String) -> Self {
        Self {
            metrics: Arc::new(AppMetrics::default()),
            start_time: Utc::now(),
            version,
        }
    }

    /// 获取应用正常运行时间
    pub fn uptime_seconds(&self) -> f64 {
        (Utc::now() - self.start_time).num_seconds() as f64
    }
}

// ===== Health Check Handlers =====

/// 获取完整健康状态
pub async fn health_check(
    state: axum::extract::State<Arc<ObservabilityState>>,
) -> impl IntoResponse {
    let health_status = HealthStatus {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
        store_messages: state.metrics.store_messages.load(Ordering::SeqCst),
    };

    (axum::http::StatusCode::OK, Json(health_status))
}

/// 简单存活检查
pub async fn liveness() -> impl IntoResponse {
    "OK"
}

/// Prometheus 指标端点
pub async fn metrics(state: axum::extract::State<Arc<ObservabilityState>>) -> impl IntoResponse {
    let output = state.metrics.gather();
    (axum::http::StatusCode::OK, output)
}

/// 版本信息端点
pub async fn version(state: axum::extract::State<Arc<ObservabilityState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "version": state.version,
        "uptime_seconds": state.uptime_seconds(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// 创建可观测性路由
pub fn create_observability_router(state: Arc<ObservabilityState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
        .route("/metrics", get(metrics))
        .route("/version", get(version))
        .with_state(state)
}
