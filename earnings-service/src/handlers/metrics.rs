use axum::response::IntoResponse;

/// Prometheus text: HTTP metrics from the shared recorder, then the
/// service's own registry.
pub async fn metrics() -> impl IntoResponse {
    let mut body = service_core::observability::render_metrics();
    body.push_str(&crate::services::metrics::get_metrics());
    body
}
