use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use std::time::Duration;

use crate::config::HttpConfig;
use crate::models::{StockState, Target};
use crate::utils::error::{AppError, Result};

/// Result of classifying one page body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub state: StockState,
    /// The configured term that matched, for out-of-stock pages.
    pub matched_term: Option<String>,
}

/// Retrieves page bodies. One request per call, bounded by a timeout.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        let language = HeaderValue::from_str(&config.accept_language).map_err(|e| {
            AppError::Config(format!("invalid Accept-Language '{}': {}", config.accept_language, e))
        })?;
        headers.insert(ACCEPT_LANGUAGE, language);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let fetch_error = |message: String| AppError::Fetch {
            url: url.to_string(),
            message,
        };

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                fetch_error("request timed out".to_string())
            } else {
                fetch_error(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP status {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| fetch_error(format!("failed to read body: {}", e)))
    }
}

/// Classify a page body: out of stock as soon as any term occurs in it,
/// ignoring case; in stock otherwise. An empty body is unusable.
pub fn classify(url: &str, body: &str, out_of_stock_terms: &[String]) -> Result<Classification> {
    if body.trim().is_empty() {
        return Err(AppError::Classify {
            url: url.to_string(),
            message: "empty response body".to_string(),
        });
    }

    let haystack = body.to_lowercase();
    let matched_term = out_of_stock_terms
        .iter()
        .find(|term| !term.is_empty() && haystack.contains(&term.to_lowercase()))
        .cloned();

    Ok(Classification {
        state: if matched_term.is_some() {
            StockState::OutOfStock
        } else {
            StockState::InStock
        },
        matched_term,
    })
}

pub async fn fetch_and_classify(fetcher: &dyn PageFetcher, target: &Target) -> Result<Classification> {
    let body = fetcher.fetch(&target.url).await?;
    classify(&target.url, &body, &target.out_of_stock_terms)
}
