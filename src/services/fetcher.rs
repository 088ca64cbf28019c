// src/services/fetcher.rs
use async_trait::async_trait;
use log::{info, warn};
use reqwest::Client;

use crate::config::SourceList;
use crate::error::{FetchError, Result};

/// A GET-only text transport. The HTTP client is the production impl; tests
/// swap in a scripted one.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::transport("<client>", e.to_string()))?;
        Ok(HttpTransport { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::transport(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::transport(url, format!("HTTP {}", status.as_u16())));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::transport(url, e.to_string()))
    }
}

/// Tries each source in order and returns the first body of at least
/// `min_length` characters. Sources after the accepted one are never requested.
pub async fn fetch_first_available<T>(transport: &T, sources: &SourceList) -> Result<String>
where
    T: Transport + ?Sized,
{
    let mut last_err: Option<FetchError> = None;

    for url in &sources.urls {
        info!("Fetching from URL: {}", url);
        match transport.get_text(url).await {
            Ok(body) => {
                let len = body.chars().count();
                if len >= sources.min_length {
                    return Ok(body);
                }
                warn!(
                    "Rejected {}: body is {} chars, need at least {}",
                    url, len, sources.min_length
                );
            }
            Err(e) => {
                warn!("Source failed: {}", e);
                last_err = Some(e);
            }
        }
    }

    Err(FetchError::AllSourcesFailed {
        last: last_err.map(Box::new),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Scripted {
        responses: HashMap<String, std::result::Result<String, String>>,
        requested: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn ok(mut self, url: &str, body: &str) -> Self {
            self.responses.insert(url.to_string(), Ok(body.to_string()));
            self
        }

        fn fail(mut self, url: &str, reason: &str) -> Self {
            self.responses.insert(url.to_string(), Err(reason.to_string()));
            self
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn get_text(&self, url: &str) -> Result<String> {
            self.requested.lock().unwrap().push(url.to_string());
            match self.responses.get(url) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(reason)) => Err(FetchError::transport(url, reason.clone())),
                None => Err(FetchError::transport(url, "HTTP 404")),
            }
        }
    }

    #[tokio::test]
    async fn falls_through_failures_and_short_bodies() {
        let transport = Scripted::default()
            .fail("a", "connection refused")
            .ok("b", "tiny")
            .ok("c", "Date,Open,High,Low,Close,Volume")
            .ok("d", "never used, never requested");
        let sources = SourceList::new(["a", "b", "c", "d"], 10);

        let body = fetch_first_available(&transport, &sources).await.unwrap();

        assert_eq!(body, "Date,Open,High,Low,Close,Volume");
        assert_eq!(*transport.requested.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn exhaustion_reports_last_error() {
        let transport = Scripted::default()
            .fail("a", "HTTP 500")
            .fail("b", "HTTP 503");
        let sources = SourceList::new(["a", "b"], 1);

        let err = fetch_first_available(&transport, &sources).await.unwrap_err();
        match err {
            FetchError::AllSourcesFailed { last: Some(last) } => {
                assert_eq!(last.to_string(), "request to b failed: HTTP 503");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn only_short_bodies_yield_generic_failure() {
        let transport = Scripted::default().ok("a", "x").ok("b", "");
        let sources = SourceList::new(["a", "b"], 5);

        let err = fetch_first_available(&transport, &sources).await.unwrap_err();
        assert!(matches!(err, FetchError::AllSourcesFailed { last: None }));
    }

    #[tokio::test]
    async fn empty_source_list_fails() {
        let transport = Scripted::default();
        let sources = SourceList::new(Vec::<String>::new(), 1);
        assert!(fetch_first_available(&transport, &sources).await.is_err());
        assert!(transport.requested.lock().unwrap().is_empty());
    }
}
