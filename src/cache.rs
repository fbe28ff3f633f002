use std::fs;

use camino::Utf8PathBuf;
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use tracing::debug;

use crate::domain::RequestParameters;
use crate::error::CollectorError;
use crate::fs_util::{read_optional, write_atomic};

/// Two-level cache location derived from a request's identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    endpoint: String,
    params: String,
}

impl CacheKey {
    /// Parameters that make two requests to the same endpoint distinct.
    const KEYED_PARAMS: [&'static str; 2] = ["from", "issueID"];

    pub fn derive(url: &str, params: &RequestParameters) -> Self {
        let endpoint = url.replace(['/', ':'], "_");
        let parts = Self::KEYED_PARAMS
            .iter()
            .filter_map(|name| params.get(name).map(|value| format!("{name}_{value}")))
            .collect::<Vec<_>>();
        let params = if parts.is_empty() {
            "all".to_string()
        } else {
            parts.join("_")
        };
        Self { endpoint, params }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn params(&self) -> &str {
        &self.params
    }
}

/// Response cache addressed by request identity, not content. The remote API
/// is assumed to answer a given request the same way every time.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: Utf8PathBuf,
}

impl CacheStore {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn path(&self, key: &CacheKey) -> Utf8PathBuf {
        self.root.join(&key.endpoint).join(&key.params)
    }

    pub fn load(&self, key: &CacheKey) -> Result<Option<Value>, CollectorError> {
        let path = self.path(key);
        let content = read_optional(&path).map_err(|err| CollectorError::CorruptCache {
            path: path.clone(),
            message: err.to_string(),
        })?;
        let Some(content) = content else {
            return Ok(None);
        };
        let document = serde_json::from_str(&content).map_err(|err| CollectorError::CorruptCache {
            path: path.clone(),
            message: err.to_string(),
        })?;
        debug!(path = %path, "cache hit");
        Ok(Some(document))
    }

    pub fn save(&self, key: &CacheKey, document: &Value) -> Result<(), CollectorError> {
        let path = self.path(key);
        let content = to_indented_json(document)?;
        write_atomic(&path, &content)?;
        debug!(path = %path, "cache saved");
        Ok(())
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        fs::metadata(self.path(key).as_std_path())
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }
}

// Four-space indent; serde_json leaves non-ASCII characters unescaped.
fn to_indented_json(document: &Value) -> Result<Vec<u8>, CollectorError> {
    let mut content = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut content, PrettyFormatter::with_indent(b"    "));
    document
        .serialize(&mut serializer)
        .map_err(|err| CollectorError::Filesystem(err.to_string()))?;
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_slugs_url_and_params() {
        let params = RequestParameters::new()
            .with("recordPacking", "json")
            .with("issueID", "X1");
        let key = CacheKey::derive("https://kokkai.ndl.go.jp/api/meeting", &params);
        assert_eq!(key.endpoint(), "https___kokkai.ndl.go.jp_api_meeting");
        assert_eq!(key.params(), "issueID_X1");
    }

    #[test]
    fn key_without_keyed_params_is_stable() {
        let params = RequestParameters::new().with("recordPacking", "json");
        let key = CacheKey::derive("http://host/api", &params);
        assert_eq!(key.params(), "all");
    }

    #[test]
    fn indented_json_keeps_unicode() {
        let doc = serde_json::json!({"nameOfHouse": "衆議院"});
        let text = String::from_utf8(to_indented_json(&doc).unwrap()).unwrap();
        assert_eq!(text, "{\n    \"nameOfHouse\": \"衆議院\"\n}");
    }
}
