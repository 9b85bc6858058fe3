use actix_web::{get, HttpResponse};
use tracing::error;

use crate::error::{AppError, Result};

#[get("/health")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

/// Prometheus scrape endpoint
#[get("/metrics")]
pub async fn serve_metrics() -> Result<HttpResponse> {
    let body = crate::metrics::render().map_err(|e| {
        error!("Failed to encode metrics: {}", e);
        AppError::Internal("Metrics encoding failed".into())
    })?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(body))
}
