//! Grounded answer generation with model-tier fallback.
//!
//! Builds a system prompt pinned to the resolved answer locale and a user
//! message carrying the question, recent conversation history, and the
//! retrieved context, then calls a chat-completion model. A transient
//! failure (429, 5xx, timeout, network) earns one retry against the
//! fallback model; anything else, including retry exhaustion, degrades to a
//! locale-appropriate apology while the underlying error goes to stderr.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::locale::{apology_message, Locale};
use crate::models::{ChatTurn, RetrievalHit};

/// History rendering bounds for the user message.
const MAX_HISTORY_TURNS: usize = 12;
const MAX_TURN_CHARS: usize = 500;

/// Outcome of a single completion attempt, classified for the tier loop.
#[derive(Debug)]
pub enum GenerationError {
    /// 429, 5xx, timeout, or network failure; worth one attempt against
    /// the fallback tier.
    Transient(String),
    /// Any other failure; retrying will not help.
    Fatal(String),
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::Transient(msg) => write!(f, "transient: {}", msg),
            GenerationError::Fatal(msg) => write!(f, "fatal: {}", msg),
        }
    }
}

/// Chat-completion seam. The production implementation is [`OpenAiChat`];
/// tests substitute scripted models.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Whether a generation credential is present at all. When false the
    /// generator short-circuits with a diagnostic instead of attempting a
    /// network call.
    fn is_configured(&self) -> bool {
        true
    }

    async fn complete(
        &self,
        model: &str,
        system: &str,
        user: &str,
    ) -> Result<String, GenerationError>;
}

pub struct GeneratedAnswer {
    pub answer: String,
    /// Which model produced the text, for provenance; `None` when no
    /// generation happened.
    pub model: Option<String>,
}

/// Run the primary/fallback tier over the configured models.
pub async fn generate_answer(
    model: &dyn ChatModel,
    config: &GenerationConfig,
    question: &str,
    history: &[ChatTurn],
    hits: &[RetrievalHit],
    answer_locale: Locale,
    site_locale: Option<Locale>,
) -> GeneratedAnswer {
    if !model.is_configured() {
        return GeneratedAnswer {
            answer: "Answer generation is not configured on this server. Set OPENAI_API_KEY to enable it.".to_string(),
            model: None,
        };
    }

    let system = build_system_prompt(answer_locale, site_locale);
    let user = build_user_message(question, history, hits);

    match model.complete(&config.primary_model, &system, &user).await {
        Ok(answer) => GeneratedAnswer {
            answer,
            model: Some(config.primary_model.clone()),
        },
        Err(GenerationError::Transient(reason)) => {
            eprintln!(
                "Warning: model '{}' failed ({}), retrying with '{}'",
                config.primary_model, reason, config.fallback_model
            );
            match model.complete(&config.fallback_model, &system, &user).await {
                Ok(answer) => GeneratedAnswer {
                    answer,
                    model: Some(config.fallback_model.clone()),
                },
                Err(e) => {
                    eprintln!("Warning: fallback model '{}' failed: {}", config.fallback_model, e);
                    GeneratedAnswer {
                        answer: apology_message(answer_locale).to_string(),
                        model: None,
                    }
                }
            }
        }
        Err(e) => {
            eprintln!("Warning: model '{}' failed: {}", config.primary_model, e);
            GeneratedAnswer {
                answer: apology_message(answer_locale).to_string(),
                model: None,
            }
        }
    }
}

/// System prompt pinned to the resolved answer locale.
pub fn build_system_prompt(answer_locale: Locale, site_locale: Option<Locale>) -> String {
    let mut prompt = format!(
        "You are the assistant of a small guesthouse website. Answer in {}.\n\
         Use only the numbered context passages below as your factual source. \
         If the context does not contain the answer, say you don't know and \
         point the guest to the contact page.\n\
         Never state prices or tariffs, even when they appear in the context; \
         instead direct the guest to the contact page for current rates.\n\
         The conversation history is only for resolving references like \
         \"that one\" or \"there\" — never treat it as a source of facts.",
        answer_locale.language_name()
    );
    if let Some(site) = site_locale {
        if site != answer_locale {
            prompt.push_str(&format!(
                "\nThe guest is browsing the {} version of the site.",
                site.language_name()
            ));
        }
    }
    prompt
}

/// User message with the question, a rendered history block, and the
/// numbered context block.
pub fn build_user_message(question: &str, history: &[ChatTurn], hits: &[RetrievalHit]) -> String {
    let mut message = String::new();

    if !history.is_empty() {
        message.push_str("Conversation so far:\n");
        let start = history.len().saturating_sub(MAX_HISTORY_TURNS);
        for turn in &history[start..] {
            let content: String = turn.content.chars().take(MAX_TURN_CHARS).collect();
            let role = if turn.role == "assistant" { "assistant" } else { "user" };
            message.push_str(&format!("{}: {}\n", role, content.trim()));
        }
        message.push('\n');
    }

    message.push_str("Context:\n");
    for (i, hit) in hits.iter().enumerate() {
        message.push_str(&format!(
            "[{}] {} ({})\n{}\n\n",
            i + 1,
            hit.payload.title,
            hit.payload.source_id,
            hit.payload.text
        ));
    }

    message.push_str(&format!("Question: {}", question));
    message
}

// ============ OpenAI-style backend ============

pub struct OpenAiChat {
    http: reqwest::Client,
    api_key: Option<String>,
    temperature: f64,
}

impl OpenAiChat {
    /// The credential is read once at construction; a missing key is not an
    /// error here, it makes [`ChatModel::is_configured`] return false.
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(
        &self,
        model: &str,
        system: &str,
        user: &str,
    ) -> Result<String, GenerationError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| GenerationError::Fatal("OPENAI_API_KEY not set".to_string()))?;

        let body = serde_json::json!({
            "model": model,
            "temperature": self.temperature,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let response = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Transient(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Transient(format!(
                "chat API error {}: {}",
                status, body_text
            )));
        }
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Fatal(format!(
                "chat API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Fatal(e.to_string()))?;

        let text = json
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|choice| choice.pointer("/message/content"))
            .and_then(|content| content.as_str())
            .unwrap_or_default()
            .trim()
            .to_string();

        if text.is_empty() {
            return Err(GenerationError::Fatal("empty completion".to_string()));
        }
        Ok(text)
    }
}
