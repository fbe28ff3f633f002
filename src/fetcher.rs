use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::{debug, info};

use crate::cache::{CacheKey, CacheStore};
use crate::domain::RequestParameters;
use crate::error::CollectorError;

/// Transport seam: one GET returning the decoded JSON body.
pub trait RecordClient: Send + Sync {
    fn get_json(&self, url: &str, params: &RequestParameters) -> Result<Value, CollectorError>;
}

#[derive(Clone)]
pub struct HttpRecordClient {
    client: Client,
}

impl HttpRecordClient {
    pub fn new(timeout: Duration) -> Result<Self, CollectorError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kokkai-collector/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CollectorError::Config(err.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| CollectorError::Config(err.to_string()))?;
        Ok(Self { client })
    }

    fn handle_status(
        url: &str,
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, CollectorError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "request failed".to_string());
        Err(CollectorError::HttpStatus {
            url: url.to_string(),
            status,
            message,
        })
    }
}

impl RecordClient for HttpRecordClient {
    fn get_json(&self, url: &str, params: &RequestParameters) -> Result<Value, CollectorError> {
        let transport = |err: reqwest::Error| CollectorError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        };
        let response = self
            .client
            .get(url)
            .query(params.pairs())
            .send()
            .map_err(transport)?;
        let response = Self::handle_status(url, response)?;
        let body = response.text().map_err(transport)?;
        if body.trim().is_empty() {
            return Err(CollectorError::EmptyResponse {
                url: url.to_string(),
            });
        }
        serde_json::from_str(&body).map_err(|err| {
            debug!(url, error = %err, "response body is not JSON");
            CollectorError::EmptyResponse {
                url: url.to_string(),
            }
        })
    }
}

/// Waits a fixed interval before every call and rejects incomplete pages.
pub struct RateLimitedFetcher<C: RecordClient> {
    client: C,
    interval: Duration,
}

impl<C: RecordClient> RateLimitedFetcher<C> {
    pub fn new(client: C, interval: Duration) -> Self {
        Self { client, interval }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn fetch(&self, url: &str, params: &RequestParameters) -> Result<Value, CollectorError> {
        if !self.interval.is_zero() {
            debug!(seconds = self.interval.as_secs_f64(), "waiting before request");
            thread::sleep(self.interval);
        }
        let document = self.client.get_json(url, params)?;
        validate_document(url, document)
    }
}

fn validate_document(url: &str, document: Value) -> Result<Value, CollectorError> {
    if !is_truthy(&document) {
        return Err(CollectorError::EmptyResponse {
            url: url.to_string(),
        });
    }
    if let Some(next) = document.get("nextRecordPosition").filter(|next| is_truthy(next)) {
        return Err(CollectorError::PaginationOverflow {
            url: url.to_string(),
            next: next.to_string(),
        });
    }
    Ok(document)
}

/// `null`, `false`, zero and empty strings/arrays/objects count as absent.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Cache,
    Network,
}

/// Cache-first fetch: a request that was ever answered successfully is never
/// sent again for the lifetime of the cache directory.
pub struct CachedFetcher<C: RecordClient> {
    cache: CacheStore,
    fetcher: RateLimitedFetcher<C>,
}

impl<C: RecordClient> CachedFetcher<C> {
    pub fn new(cache: CacheStore, fetcher: RateLimitedFetcher<C>) -> Self {
        Self { cache, fetcher }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn fetcher(&self) -> &RateLimitedFetcher<C> {
        &self.fetcher
    }

    pub fn get(&self, url: &str, params: &RequestParameters) -> Result<Value, CollectorError> {
        self.get_with_source(url, params).map(|(document, _)| document)
    }

    pub fn get_with_source(
        &self,
        url: &str,
        params: &RequestParameters,
    ) -> Result<(Value, FetchSource), CollectorError> {
        let key = CacheKey::derive(url, params);
        if let Some(document) = self.cache.load(&key)? {
            return Ok((document, FetchSource::Cache));
        }

        info!(url, key = key.params(), "fetching");
        let document = self.fetcher.fetch(url, params)?;
        self.cache.save(&key, &document)?;
        Ok((document, FetchSource::Network))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_documents_are_rejected() {
        for doc in [json!(null), json!({}), json!([])] {
            let err = validate_document("u", doc).unwrap_err();
            assert_matches!(err, CollectorError::EmptyResponse { .. });
        }
    }

    #[test]
    fn falsy_next_position_is_accepted() {
        for next in [json!(null), json!(""), json!(0), json!(false)] {
            let doc = json!({"numberOfReturn": 1, "nextRecordPosition": next});
            assert!(validate_document("u", doc).is_ok());
        }
        let doc = json!({"numberOfReturn": 0});
        assert!(validate_document("u", doc).is_ok());
    }

    #[test]
    fn truthy_next_position_is_overflow() {
        for next in [json!(101), json!("101")] {
            let doc = json!({"numberOfReturn": 100, "nextRecordPosition": next});
            let err = validate_document("u", doc).unwrap_err();
            assert_matches!(err, CollectorError::PaginationOverflow { .. });
        }
    }
}
