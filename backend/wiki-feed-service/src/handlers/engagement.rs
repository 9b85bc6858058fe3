use actix_web::{post, web, HttpResponse};
use serde::{Deserialize, Serialize};

use super::UserId;
use crate::error::{AppError, Result};
use crate::services::{EngagementEvent, EngagementRecorder};

#[derive(Debug, Deserialize)]
pub struct EngagementRequest {
    pub content_id: String,
    pub event: EngagementEvent,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EngagementResponse {
    pub recorded: bool,
}

pub struct EngagementHandlerState {
    pub recorder: EngagementRecorder,
}

#[post("/engagement")]
pub async fn record_engagement(
    user: UserId,
    body: web::Json<EngagementRequest>,
    state: web::Data<EngagementHandlerState>,
) -> Result<HttpResponse> {
    let content_id = body.content_id.trim();
    if content_id.is_empty() {
        return Err(AppError::BadRequest("content_id must not be empty".into()));
    }
    if let EngagementEvent::View { duration } = body.event {
        if !duration.is_finite() || duration < 0.0 {
            return Err(AppError::BadRequest("duration must be a non-negative number".into()));
        }
    }

    let recorded = state
        .recorder
        .record(user.0, content_id, &body.event)
        .await?;

    Ok(HttpResponse::Ok().json(EngagementResponse { recorded }))
}
