//! Embedding provider abstraction and implementations.
//!
//! Defines the [`EmbeddingProvider`] trait and concrete implementations:
//! - **[`DisabledProvider`]**: returns errors; used when embeddings are not configured.
//! - **[`OpenAIProvider`]**: calls the OpenAI embeddings API with retry and backoff.
//!
//! Also provides [`decode_stored_vector`], the normalization step applied to
//! embedding values read back from the persistence layer. Corpora migrated
//! from older deployments carry vectors in three shapes: a native JSON array,
//! a JSON-text-encoded array, or an object keyed by numeric index. All three
//! normalize to a plain `Vec<f32>` before any similarity scoring.
//!
//! # Provider Selection
//!
//! Use [`create_provider`] to instantiate the appropriate provider based on
//! the configuration:
//!
//! ```rust,no_run
//! # use corpus_gate::config::EmbeddingConfig;
//! # use corpus_gate::embedding::create_provider;
//! let config = EmbeddingConfig::default(); // provider = "disabled"
//! let provider = create_provider(&config).unwrap();
//! assert_eq!(provider.model_name(), "disabled");
//! ```
//!
//! # Retry Strategy
//!
//! The OpenAI provider uses exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use async_trait::async_trait;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::EngineError;

/// Capability the engine requires from an embedding backend.
///
/// Injected at engine construction time; the engine never embeds the same
/// text twice for the same purpose without caller intent.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;

    /// Convert a text string into a fixed-length vector.
    ///
    /// # Errors
    ///
    /// [`EngineError::EmbeddingUnavailable`] when the backend cannot produce
    /// a vector (misconfiguration, quota, transient network fault).
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError>;
}

// ============ Disabled Provider ============

/// A no-op embedding provider that always returns errors.
///
/// Used when `embedding.provider = "disabled"` in the configuration. Any
/// attempt to embed text fails with [`EngineError::EmbeddingUnavailable`].
pub struct DisabledProvider;

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }

    fn dims(&self) -> usize {
        0
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EngineError> {
        Err(EngineError::EmbeddingUnavailable(
            "embedding provider is disabled".to_string(),
        ))
    }
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API.
///
/// Calls the `POST /v1/embeddings` endpoint with the configured model.
/// Requires the `OPENAI_API_KEY` environment variable to be set.
pub struct OpenAIProvider {
    /// Model name (e.g. `"text-embedding-3-small"`).
    model: String,
    /// Vector dimensionality (e.g. `1536`).
    dims: usize,
    max_retries: u32,
    timeout_secs: u64,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `model` or `dims` is not set in config, or if
    /// `OPENAI_API_KEY` is not in the environment.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EngineError> {
        let model = config.model.clone().ok_or_else(|| {
            EngineError::InvalidInput("embedding.model required for OpenAI provider".to_string())
        })?;
        let dims = config.dims.ok_or_else(|| {
            EngineError::InvalidInput("embedding.dims required for OpenAI provider".to_string())
        })?;

        if std::env::var("OPENAI_API_KEY").is_err() {
            return Err(EngineError::EmbeddingUnavailable(
                "OPENAI_API_KEY environment variable not set".to_string(),
            ));
        }

        Ok(Self {
            model,
            dims,
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            EngineError::EmbeddingUnavailable("OPENAI_API_KEY not set".to_string())
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| EngineError::EmbeddingUnavailable(e.to_string()))?;

        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post("https://api.openai.com/v1/embeddings")
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await.map_err(|e| {
                            EngineError::EmbeddingUnavailable(e.to_string())
                        })?;
                        return parse_openai_response(&json);
                    }

                    // Rate limited or server error, retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(format!("OpenAI API error {}: {}", status, body_text));
                        continue;
                    }

                    // Client error (not 429), don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    return Err(EngineError::EmbeddingUnavailable(format!(
                        "OpenAI API error {}: {}",
                        status, body_text
                    )));
                }
                Err(e) => {
                    last_err = Some(e.to_string());
                    continue;
                }
            }
        }

        Err(EngineError::EmbeddingUnavailable(
            last_err.unwrap_or_else(|| "embedding failed after retries".to_string()),
        ))
    }
}

/// Parse the OpenAI embeddings API response JSON for a single input.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<f32>, EngineError> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| {
            EngineError::EmbeddingUnavailable("invalid OpenAI response: missing embedding".to_string())
        })?;

    Ok(embedding
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

/// Create the appropriate [`EmbeddingProvider`] based on configuration.
///
/// # Supported Providers
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledProvider`] |
/// | `"openai"` | [`OpenAIProvider`] |
///
/// # Errors
///
/// Returns an error for unknown provider names or if the OpenAI provider
/// cannot be initialized (missing config or API key).
pub fn create_provider(
    config: &EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>, EngineError> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledProvider)),
        "openai" => Ok(Box::new(OpenAIProvider::new(config)?)),
        other => Err(EngineError::InvalidInput(format!(
            "unknown embedding provider: {}",
            other
        ))),
    }
}

// ============ Stored vector normalization ============

/// Normalize a stored embedding value to a plain numeric vector.
///
/// Tolerates the three shapes observed in persisted corpora:
/// - a native JSON array: `[0.1, 0.2]`
/// - a JSON-text-encoded array: `"[0.1, 0.2]"`
/// - an object keyed by numeric index: `{"0": 0.1, "1": 0.2}`
///
/// Returns `None` for anything else, which callers treat the same as an
/// absent embedding.
pub fn decode_stored_vector(value: &serde_json::Value) -> Option<Vec<f32>> {
    match value {
        serde_json::Value::Array(items) => items
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect(),
        serde_json::Value::String(text) => {
            let parsed: serde_json::Value = serde_json::from_str(text).ok()?;
            match parsed {
                serde_json::Value::Array(_) => decode_stored_vector(&parsed),
                _ => None,
            }
        }
        serde_json::Value::Object(map) => {
            let mut entries: Vec<(usize, f32)> = Vec::with_capacity(map.len());
            for (key, v) in map {
                let idx = key.parse::<usize>().ok()?;
                entries.push((idx, v.as_f64()? as f32));
            }
            entries.sort_by_key(|(idx, _)| *idx);
            Some(entries.into_iter().map(|(_, f)| f).collect())
        }
        _ => None,
    }
}

/// Encode a vector in the engine's native stored form (a JSON array).
pub fn encode_stored_vector(vector: &[f32]) -> serde_json::Value {
    serde_json::Value::Array(
        vector
            .iter()
            .map(|f| {
                serde_json::Number::from_f64(*f as f64)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_native_array() {
        let v = json!([0.5, -1.0, 2.25]);
        assert_eq!(decode_stored_vector(&v), Some(vec![0.5, -1.0, 2.25]));
    }

    #[test]
    fn test_decode_json_text_array() {
        let v = json!("[0.5, -1.0, 2.25]");
        assert_eq!(decode_stored_vector(&v), Some(vec![0.5, -1.0, 2.25]));
    }

    #[test]
    fn test_decode_keyed_object() {
        let v = json!({"1": -1.0, "0": 0.5, "2": 2.25});
        assert_eq!(decode_stored_vector(&v), Some(vec![0.5, -1.0, 2.25]));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(decode_stored_vector(&json!("not a vector")), None);
        assert_eq!(decode_stored_vector(&json!(42)), None);
        assert_eq!(decode_stored_vector(&json!(null)), None);
        assert_eq!(decode_stored_vector(&json!({"a": 1.0})), None);
        assert_eq!(decode_stored_vector(&json!([1.0, "x"])), None);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let v = vec![1.0f32, -2.5, 3.125];
        let stored = encode_stored_vector(&v);
        assert_eq!(decode_stored_vector(&stored), Some(v));
    }

    #[test]
    fn test_parse_openai_response() {
        let json = json!({"data": [{"embedding": [0.1, 0.2, 0.3]}]});
        let vec = parse_openai_response(&json).unwrap();
        assert_eq!(vec.len(), 3);
        assert!((vec[0] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_parse_openai_response_missing_data() {
        let json = json!({"error": "nope"});
        assert!(parse_openai_response(&json).is_err());
    }

    #[tokio::test]
    async fn test_disabled_provider_errors() {
        let err = DisabledProvider.embed("hello").await.unwrap_err();
        assert!(matches!(err, EngineError::EmbeddingUnavailable(_)));
    }
}
