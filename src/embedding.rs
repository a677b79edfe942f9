//! Text embedding with a deterministic local mode and an optional remote
//! provider.
//!
//! The local mode is a dependency-free hashing embedder: each word token
//! increments one slot of the vector (sign taken from the hash), and for
//! longer tokens each 3-character shingle perturbs a second slot at a
//! smaller magnitude to capture sub-word similarity. Output vectors are
//! always L2-normalized.
//!
//! The remote mode calls an OpenAI-style embeddings endpoint. Any remote
//! failure (network, non-2xx, empty vector) logs a warning and falls back
//! to the local mode, so embedding is never a hard failure point for the
//! query path.

use anyhow::{bail, Result};
use std::time::Duration;

use crate::config::EmbeddingConfig;

/// Magnitude of the per-shingle perturbation relative to the ±1.0 token
/// increment.
const SHINGLE_WEIGHT: f32 = 0.25;

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

pub struct Embedder {
    provider: String,
    model: Option<String>,
    dims: usize,
    http: reqwest::Client,
    endpoint: String,
}

impl Embedder {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        if config.provider == "openai" && config.model.is_none() {
            bail!("embedding.model required for the openai provider");
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            provider: config.provider.clone(),
            model: config.model.clone(),
            dims: config.dims,
            http,
            endpoint: OPENAI_EMBEDDINGS_URL.to_string(),
        })
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Embed one text into a unit-norm vector.
    ///
    /// Infallible by contract: the remote provider is attempted when
    /// configured, and any error is downgraded to a warning plus a local
    /// embedding of the same text.
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        if self.provider == "openai" {
            match self.embed_remote(text).await {
                Ok(vector) => return vector,
                Err(e) => {
                    eprintln!("Warning: remote embedding failed, using local: {}", e);
                }
            }
        }
        local_embed(text, self.dims)
    }

    async fn embed_remote(&self, text: &str) -> Result<Vec<f32>> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("embedding.model not set"))?;

        let body = serde_json::json!({
            "model": model,
            "input": text,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("embeddings API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        let vector: Vec<f32> = json
            .get("data")
            .and_then(|d| d.as_array())
            .and_then(|d| d.first())
            .and_then(|item| item.get("embedding"))
            .and_then(|e| e.as_array())
            .map(|e| e.iter().map(|v| v.as_f64().unwrap_or(0.0) as f32).collect())
            .unwrap_or_default();

        if vector.is_empty() {
            bail!("embeddings API returned an empty vector");
        }

        Ok(l2_normalize(vector))
    }
}

/// Deterministic hashing embedder.
pub fn local_embed(text: &str, dims: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dims];

    for token in tokenize(text) {
        let hash = fnv1a(token.as_bytes());
        let slot = (hash as usize) % dims;
        let sign = if hash & 0x8000_0000 != 0 { -1.0 } else { 1.0 };
        vector[slot] += sign;

        let chars: Vec<char> = token.chars().collect();
        if chars.len() > 3 {
            for shingle in chars.windows(3) {
                let shingle: String = shingle.iter().collect();
                let shash = fnv1a(shingle.as_bytes());
                let sslot = (shash as usize) % dims;
                let ssign = if shash & 0x8000_0000 != 0 { -1.0 } else { 1.0 };
                vector[sslot] += ssign * SHINGLE_WEIGHT;
            }
        }
    }

    l2_normalize(vector)
}

/// Lower-case word tokens, with non-letter/non-digit characters treated as
/// separators.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
        .collect()
}

/// Stable 32-bit FNV-1a hash.
fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for &byte in bytes {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// Divide by the Euclidean norm, substituting 1 for a zero norm.
pub fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm = if norm > 0.0 { norm } else { 1.0 };
    for v in &mut vector {
        *v /= norm;
    }
    vector
}

/// Cosine similarity of two vectors; 0.0 for mismatched or empty input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f64::EPSILON {
        return 0.0;
    }
    dot / denom
}
