use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::debug;

use super::UserId;
use crate::error::Result;
use crate::models::FeedResponse;
use crate::services::FeedGenerator;

/// Ids the client already shows, as a comma separated list
#[derive(Debug, Default, Deserialize)]
pub struct FeedQueryParams {
    #[serde(default)]
    pub exclude: Option<String>,
}

impl FeedQueryParams {
    pub fn exclude_set(&self) -> HashSet<String> {
        self.exclude
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }
}

pub struct FeedHandlerState {
    pub feed: FeedGenerator,
}

#[get("/feed")]
pub async fn get_feed(
    user: UserId,
    query: web::Query<FeedQueryParams>,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    let exclude = query.exclude_set();
    let count = state.feed.config().page_size;
    debug!(user_id = user.0, count, excluded = exclude.len(), "Getting feed");

    let items = state.feed.generate(user.0, count, &exclude).await?;
    Ok(HttpResponse::Ok().json(FeedResponse { items }))
}

/// Anonymous callers get an empty page rather than 401
#[get("/load_more")]
pub async fn load_more(
    user: Option<UserId>,
    query: web::Query<FeedQueryParams>,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    let Some(user) = user else {
        return Ok(HttpResponse::Ok().json(FeedResponse { items: Vec::new() }));
    };

    let exclude = query.exclude_set();
    debug!(user_id = user.0, excluded = exclude.len(), "Loading more");

    let items = state.feed.load_more(user.0, &exclude).await?;
    Ok(HttpResponse::Ok().json(FeedResponse { items }))
}
