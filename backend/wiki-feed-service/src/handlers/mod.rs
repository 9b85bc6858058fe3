pub mod engagement;
pub mod feed;
pub mod health;

pub use engagement::{record_engagement, EngagementHandlerState, EngagementRequest};
pub use feed::{get_feed, load_more, FeedHandlerState, FeedQueryParams};
pub use health::{health_check, serve_metrics};

use actix_web::{web, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "X-User-Id";

/// Caller identity taken from the `X-User-Id` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub i64);

impl FromRequest for UserId {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(
            req.headers()
                .get(USER_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<i64>().ok())
                .map(UserId)
                .ok_or_else(|| AppError::Unauthorized("Missing or invalid user id".into())),
        )
    }
}

/// Register every route the service exposes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(serve_metrics)
        .service(
            web::scope("/api")
                .service(get_feed)
                .service(load_more)
                .service(record_engagement),
        );
}
