//! Online query path: validation, retrieval, and answer assembly.
//!
//! One request runs, in sequence: question validation, answer-locale
//! resolution, retrieval-question folding from the recent history, one
//! embedding, a locale-scoped search (widened with a global search when it
//! comes up short), dedup/truncation of the evidence, and finally the
//! answer generator. When no evidence survives, the generator is skipped
//! and a fixed "no relevant content" message is returned in the resolved
//! answer locale.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::chunk::normalize_whitespace;
use crate::config::Config;
use crate::embedding::Embedder;
use crate::generate::{generate_answer, ChatModel};
use crate::locale::{no_context_message, resolve_answer_locale, Locale};
use crate::models::{ChatTurn, RetrievalHit, SourceRef};
use crate::store::VectorStore;

/// Question length bounds, measured after trimming.
const MIN_QUESTION_CHARS: usize = 3;
const MAX_QUESTION_CHARS: usize = 2000;

/// `topK` clamp range.
const MIN_TOP_K: usize = 1;
const MAX_TOP_K: usize = 12;

/// How many prior user turns fold into the retrieval question.
const FOLDED_USER_TURNS: usize = 2;
const FOLDED_TURN_CHARS: usize = 300;

#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    pub question: String,
    /// Site-locale preference of the caller.
    pub locale: Option<String>,
    #[serde(rename = "topK")]
    pub top_k: Option<usize>,
    #[serde(rename = "sessionId")]
    #[allow(dead_code)]
    pub session_id: Option<String>,
    pub history: Option<Vec<ChatTurn>>,
    /// Caller-supplied override of the folded retrieval question.
    #[serde(rename = "retrievalQuestion")]
    pub retrieval_question: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub ok: bool,
    pub model: Option<String>,
    #[serde(rename = "answerLocale")]
    pub answer_locale: Locale,
    #[serde(rename = "preferredLocale")]
    pub preferred_locale: Option<Locale>,
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

/// Handle one question end to end.
pub async fn answer_question(
    request: &AskRequest,
    config: &Config,
    embedder: &Embedder,
    store: &dyn VectorStore,
    model: &dyn ChatModel,
) -> Result<AskResponse> {
    let question = request.question.trim();
    let question_chars = question.chars().count();
    if question_chars < MIN_QUESTION_CHARS || question_chars > MAX_QUESTION_CHARS {
        bail!(
            "question must be between {} and {} characters",
            MIN_QUESTION_CHARS,
            MAX_QUESTION_CHARS
        );
    }

    let site_locale = request
        .locale
        .as_deref()
        .and_then(Locale::from_code);
    let answer_locale = resolve_answer_locale(question, site_locale);

    let history = request.history.as_deref().unwrap_or(&[]);
    let retrieval_question =
        resolve_retrieval_question(request.retrieval_question.as_deref(), history, question);

    let top_k = request
        .top_k
        .unwrap_or(config.retrieval.top_k)
        .clamp(MIN_TOP_K, MAX_TOP_K);

    let vector = embedder.embed(&retrieval_question).await;

    // Scoped first; widen globally only when the scoped tier comes up short.
    let search_locale = site_locale.unwrap_or(answer_locale);
    let scoped = store.search(&vector, top_k, Some(search_locale)).await?;
    let hits = if scoped.len() < top_k {
        let global = store.search(&vector, top_k, None).await?;
        merge_hits(scoped, global)
    } else {
        scoped
    };

    let mut hits = hits;
    hits.truncate(config.retrieval.max_context_chunks);

    if hits.is_empty() {
        return Ok(AskResponse {
            ok: true,
            model: None,
            answer_locale,
            preferred_locale: site_locale,
            answer: no_context_message(answer_locale).to_string(),
            sources: Vec::new(),
        });
    }

    let sources = project_sources(&hits);
    let generated = generate_answer(
        model,
        &config.generation,
        question,
        history,
        &hits,
        answer_locale,
        site_locale,
    )
    .await;

    Ok(AskResponse {
        ok: true,
        model: generated.model,
        answer_locale,
        preferred_locale: site_locale,
        answer: generated.answer,
        sources,
    })
}

/// Pick the text the search vector is built from: a non-blank caller
/// override wins verbatim (normalized), otherwise the recent history is
/// folded into the current question.
pub fn resolve_retrieval_question(
    override_question: Option<&str>,
    history: &[ChatTurn],
    question: &str,
) -> String {
    match override_question {
        Some(provided) if !provided.trim().is_empty() => normalize_whitespace(provided),
        _ => build_retrieval_question(history, question),
    }
}

/// Fold the last prior user turns into the retrieval question so pronoun
/// references ("that one", "there") still pull in the right context.
///
/// Each piece is whitespace-normalized and length-capped; consecutive exact
/// duplicates are dropped.
pub fn build_retrieval_question(history: &[ChatTurn], question: &str) -> String {
    let mut pieces: Vec<String> = history
        .iter()
        .filter(|turn| turn.role == "user")
        .rev()
        .take(FOLDED_USER_TURNS)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .map(|turn| {
            normalize_whitespace(&turn.content)
                .chars()
                .take(FOLDED_TURN_CHARS)
                .collect::<String>()
        })
        .filter(|piece| !piece.is_empty())
        .collect();

    pieces.push(
        normalize_whitespace(question)
            .chars()
            .take(FOLDED_TURN_CHARS)
            .collect(),
    );
    pieces.dedup();
    pieces.join("\n")
}

/// Merge two result tiers, deduplicating by point id. First occurrence
/// wins, so the scoped tier keeps its priority over the global one.
pub fn merge_hits(scoped: Vec<RetrievalHit>, global: Vec<RetrievalHit>) -> Vec<RetrievalHit> {
    let mut merged: Vec<RetrievalHit> = Vec::with_capacity(scoped.len() + global.len());
    for hit in scoped.into_iter().chain(global) {
        if !merged.iter().any(|existing| existing.id == hit.id) {
            merged.push(hit);
        }
    }
    merged
}

/// Deduplicate hits by source for citation display, keeping the first
/// (best) score seen per source.
pub fn project_sources(hits: &[RetrievalHit]) -> Vec<SourceRef> {
    let mut sources: Vec<SourceRef> = Vec::new();
    for hit in hits {
        if sources.iter().any(|s| s.source_id == hit.payload.source_id) {
            continue;
        }
        sources.push(SourceRef {
            source_id: hit.payload.source_id.clone(),
            title: hit.payload.title.clone(),
            locale: hit.payload.locale,
            url: hit.payload.url.clone(),
            score: hit.score,
        });
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PointPayload;

    fn turn(role: &str, content: &str) -> ChatTurn {
        ChatTurn {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    fn hit(id: &str, source_id: &str, score: f64) -> RetrievalHit {
        RetrievalHit {
            id: id.to_string(),
            score,
            payload: PointPayload {
                source_id: source_id.to_string(),
                title: source_id.to_string(),
                locale: Locale::En,
                url: format!("/{}", source_id),
                updated_at: None,
                chunk_index: 0,
                text: "text".to_string(),
            },
        }
    }

    #[test]
    fn test_merge_keeps_scoped_priority() {
        let scoped = vec![hit("A", "src-a", 0.9), hit("B", "src-b", 0.8)];
        let global = vec![hit("B", "src-b", 0.85), hit("C", "src-c", 0.7)];
        let merged = merge_hits(scoped, global);
        let ids: Vec<&str> = merged.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        // The scoped B wins over the global duplicate.
        assert!((merged[1].score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_retrieval_question_folds_recent_user_turns() {
        let history = vec![
            turn("user", "Tell me about the   Flamingo apartment"),
            turn("assistant", "It sleeps four."),
            turn("user", "Does it have a balcony?"),
        ];
        let folded = build_retrieval_question(&history, "And what about parking there?");
        assert_eq!(
            folded,
            "Tell me about the Flamingo apartment\nDoes it have a balcony?\nAnd what about parking there?"
        );
    }

    #[test]
    fn test_retrieval_question_drops_consecutive_duplicates() {
        let history = vec![turn("user", "parking?")];
        let folded = build_retrieval_question(&history, "parking?");
        assert_eq!(folded, "parking?");
    }

    #[test]
    fn test_retrieval_question_only_last_two_user_turns() {
        let history = vec![
            turn("user", "first"),
            turn("user", "second"),
            turn("user", "third"),
        ];
        let folded = build_retrieval_question(&history, "now");
        assert_eq!(folded, "second\nthird\nnow");
    }

    #[test]
    fn test_override_replaces_history_folding() {
        let history = vec![turn("user", "Tell me about the Flamingo apartment")];
        let resolved =
            resolve_retrieval_question(Some("  pet   policy  "), &history, "And dogs?");
        assert_eq!(resolved, "pet policy");
    }

    #[test]
    fn test_blank_override_falls_back_to_folding() {
        let history = vec![turn("user", "Tell me about the Flamingo apartment")];
        let expected = "Tell me about the Flamingo apartment\nAnd dogs?";
        assert_eq!(
            resolve_retrieval_question(Some("   "), &history, "And dogs?"),
            expected
        );
        assert_eq!(
            resolve_retrieval_question(None, &history, "And dogs?"),
            expected
        );
    }

    #[test]
    fn test_folded_pieces_are_length_capped() {
        let history = vec![turn("user", &"h".repeat(400))];
        let folded = build_retrieval_question(&history, &"q".repeat(400));
        for piece in folded.split('\n') {
            assert!(piece.chars().count() <= 300, "piece over cap: {}", piece.len());
        }
    }

    #[test]
    fn test_sources_dedup_by_source_id_keep_first_score() {
        let hits = vec![
            hit("1", "hotel:flamingo:en", 0.9),
            hit("2", "hotel:flamingo:en", 0.8),
            hit("3", "content:page.faq:en", 0.7),
        ];
        let sources = project_sources(&hits);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].source_id, "hotel:flamingo:en");
        assert!((sources[0].score - 0.9).abs() < 1e-9);
    }
}
