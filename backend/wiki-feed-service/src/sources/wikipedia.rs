/// Wikipedia content source
///
/// Talks to the MediaWiki Action API. One request resolves a random title,
/// one request resolves an article with its intro extract, lead image,
/// outgoing article links and visible categories.
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Instant;
use tracing::debug;

use super::{ContentSource, RawContent, SourceError};
use crate::metrics;

const CATEGORY_PREFIX: &str = "Category:";
const RATE_LIMITED_CODE: &str = "ratelimited";

#[derive(Clone)]
pub struct WikipediaSource {
    client: reqwest::Client,
    api_url: String,
}

impl WikipediaSource {
    pub fn new(api_url: &str, user_agent: &str) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| SourceError::Unavailable(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
        })
    }

    async fn query<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        params: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        let started = Instant::now();
        let result = self.send(params).await;
        metrics::record_source_request(
            operation,
            result.as_ref().err().map(|e| e.kind()).unwrap_or("ok"),
            started.elapsed(),
        );

        let body = result?;
        serde_json::from_str(&body)
            .map_err(|e| SourceError::Unavailable(format!("Malformed API response: {}", e)))
    }

    async fn send(&self, params: &[(&str, &str)]) -> Result<String, SourceError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("action", "query"), ("format", "json"), ("formatversion", "2")])
            .query(params)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(response.url().to_string()));
        }
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))
    }
}

#[async_trait]
impl ContentSource for WikipediaSource {
    async fn random_topic(&self) -> Result<String, SourceError> {
        let response: RandomResponse = self
            .query(
                "random",
                &[("list", "random"), ("rnnamespace", "0"), ("rnlimit", "1")],
            )
            .await?;

        if let Some(error) = response.error {
            return Err(error.into_source_error());
        }

        let title = response
            .query
            .and_then(|q| q.random.into_iter().next())
            .map(|r| r.title)
            .ok_or_else(|| SourceError::Unavailable("Empty random response".to_string()))?;

        debug!(title = %title, "Resolved random topic");
        Ok(title)
    }

    async fn fetch(&self, title: &str) -> Result<RawContent, SourceError> {
        let response: PageResponse = self
            .query(
                "fetch",
                &[
                    ("titles", title),
                    ("redirects", "1"),
                    ("prop", "extracts|pageimages|links|categories"),
                    ("exintro", "1"),
                    ("explaintext", "1"),
                    ("piprop", "original"),
                    ("plnamespace", "0"),
                    ("pllimit", "max"),
                    ("cllimit", "max"),
                    ("clshow", "!hidden"),
                ],
            )
            .await?;

        parse_page(title, response)
    }
}

/// Turn a `formatversion=2` page query into [`RawContent`].
fn parse_page(requested: &str, response: PageResponse) -> Result<RawContent, SourceError> {
    // MediaWiki reports throttling and overload in-band with HTTP 200
    if let Some(error) = response.error {
        return Err(error.into_source_error());
    }

    let page = response
        .query
        .and_then(|q| q.pages.into_iter().next())
        .ok_or_else(|| SourceError::Unavailable("Empty page response".to_string()))?;

    if page.missing || page.invalid {
        return Err(SourceError::NotFound(requested.to_string()));
    }

    Ok(RawContent {
        title: page.title,
        summary: page.extract.unwrap_or_default(),
        images: page.original.map(|img| vec![img.source]).unwrap_or_default(),
        links: page.links.into_iter().map(|l| l.title).collect(),
        categories: page
            .categories
            .into_iter()
            .map(|c| match c.title.strip_prefix(CATEGORY_PREFIX) {
                Some(name) => name.to_string(),
                None => c.title,
            })
            .collect(),
    })
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    info: String,
}

impl ApiError {
    fn into_source_error(self) -> SourceError {
        match self.code.as_str() {
            RATE_LIMITED_CODE => SourceError::RateLimited,
            _ => SourceError::Unavailable(format!("API error {}: {}", self.code, self.info)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RandomResponse {
    error: Option<ApiError>,
    query: Option<RandomQuery>,
}

#[derive(Debug, Deserialize)]
struct RandomQuery {
    #[serde(default)]
    random: Vec<TitleRef>,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    error: Option<ApiError>,
    query: Option<PageQuery>,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    extract: Option<String>,
    original: Option<PageImage>,
    #[serde(default)]
    links: Vec<TitleRef>,
    #[serde(default)]
    categories: Vec<TitleRef>,
}

#[derive(Debug, Deserialize)]
struct PageImage {
    source: String,
}

#[derive(Debug, Deserialize)]
struct TitleRef {
    title: String,
}
