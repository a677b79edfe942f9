//! Loading indexable documents from the CMS content store.
//!
//! Two origins feed the indexer: generic page content (`content_entries`)
//! and per-locale hotel listings (`hotels`). Both store their body as a
//! JSON tree, which is flattened into searchable text here. Entries whose
//! flattened text falls below the configured minimum length are treated as
//! noise and skipped.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::chunk::{flatten_value, normalize_whitespace};
use crate::locale::Locale;
use crate::models::SourceDocument;

/// Load every SourceDocument from the content store.
pub async fn load_documents(pool: &SqlitePool, min_doc_chars: usize) -> Result<Vec<SourceDocument>> {
    let mut docs = Vec::new();

    let rows = sqlx::query("SELECT key, locale, value_json, url, updated_at FROM content_entries")
        .fetch_all(pool)
        .await?;

    for row in &rows {
        let key: String = row.get("key");
        let locale_code: String = row.get("locale");
        let Some(locale) = Locale::from_code(&locale_code) else {
            eprintln!("Warning: skipping content '{}' with unknown locale '{}'", key, locale_code);
            continue;
        };

        let value_json: String = row.get("value_json");
        let value: serde_json::Value = serde_json::from_str(&value_json)?;
        let text = normalize_whitespace(&flatten_value(&value));
        if text.chars().count() < min_doc_chars {
            continue;
        }

        let title = value
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or(&key)
            .to_string();
        let url: Option<String> = row.get("url");

        docs.push(SourceDocument {
            source_id: format!("content:{}:{}", key, locale),
            title,
            locale,
            url: url.unwrap_or_else(|| format!("/{}", key.replace('.', "/"))),
            updated_at: row.get("updated_at"),
            text,
        });
    }

    let rows = sqlx::query("SELECT slug, locale, data_json, url, updated_at FROM hotels")
        .fetch_all(pool)
        .await?;

    for row in &rows {
        let slug: String = row.get("slug");
        let locale_code: String = row.get("locale");
        let Some(locale) = Locale::from_code(&locale_code) else {
            eprintln!("Warning: skipping hotel '{}' with unknown locale '{}'", slug, locale_code);
            continue;
        };

        let data_json: String = row.get("data_json");
        let data: serde_json::Value = serde_json::from_str(&data_json)?;
        let text = normalize_whitespace(&flatten_value(&data));
        if text.chars().count() < min_doc_chars {
            continue;
        }

        let title = data
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or(&slug)
            .to_string();
        let url: Option<String> = row.get("url");

        docs.push(SourceDocument {
            source_id: format!("hotel:{}:{}", slug, locale),
            title,
            locale,
            url: url.unwrap_or_else(|| format!("/hotels/{}", slug)),
            updated_at: row.get("updated_at"),
            text,
        });
    }

    Ok(docs)
}
