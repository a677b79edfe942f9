//! Content-store tests: schema bootstrap plus document loading and
//! flattening from a real SQLite file.

use std::path::PathBuf;

use tempfile::TempDir;

use concierge::config::{
    ChunkingConfig, Config, ContentConfig, EmbeddingConfig, GenerationConfig, RetrievalConfig,
    ServerConfig, VectorStoreConfig,
};
use concierge::content::load_documents;
use concierge::db;
use concierge::locale::Locale;
use concierge::migrate::run_migrations;

fn config_for(db_path: PathBuf) -> Config {
    Config {
        content: ContentConfig { db_path },
        vector_store: VectorStoreConfig {
            url: "http://127.0.0.1:6333".to_string(),
            collection: "test".to_string(),
            timeout_secs: 5,
        },
        chunking: ChunkingConfig::default(),
        retrieval: RetrievalConfig::default(),
        embedding: EmbeddingConfig::default(),
        generation: GenerationConfig::default(),
        server: ServerConfig {
            bind: "127.0.0.1:0".to_string(),
        },
    }
}

#[tokio::test]
async fn test_load_documents_from_both_origins() {
    let tmp = TempDir::new().unwrap();
    let config = config_for(tmp.path().join("content.sqlite"));
    run_migrations(&config).await.unwrap();

    let pool = db::connect(&config).await.unwrap();

    sqlx::query(
        "INSERT INTO content_entries (key, locale, value_json, url, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind("page.home")
    .bind("en")
    .bind(r#"{"title":"Welcome","intro":"A family-run guesthouse a short walk from the beach, open all year."}"#)
    .bind("/en")
    .bind(1_700_000_000i64)
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO hotels (slug, locale, data_json, url, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind("flamingo")
    .bind("en")
    .bind(r#"{"name":"Flamingo Apartment","amenities":["air conditioning","wifi","balcony"],"description":"Bright two-room apartment overlooking the garden."}"#)
    .bind(Option::<String>::None)
    .bind(1_700_000_100i64)
    .execute(&pool)
    .await
    .unwrap();

    let docs = load_documents(&pool, 40).await.unwrap();
    pool.close().await;

    assert_eq!(docs.len(), 2);

    let home = docs.iter().find(|d| d.source_id == "content:page.home:en").unwrap();
    assert_eq!(home.title, "Welcome");
    assert_eq!(home.locale, Locale::En);
    assert_eq!(home.url, "/en");
    assert!(home.text.contains("family-run guesthouse"));

    let flamingo = docs.iter().find(|d| d.source_id == "hotel:flamingo:en").unwrap();
    assert_eq!(flamingo.title, "Flamingo Apartment");
    // Derived URL when the CMS didn't provide one.
    assert_eq!(flamingo.url, "/hotels/flamingo");
    assert!(flamingo.text.contains("air conditioning"));
}

#[tokio::test]
async fn test_short_and_unknown_locale_entries_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let config = config_for(tmp.path().join("content.sqlite"));
    run_migrations(&config).await.unwrap();

    let pool = db::connect(&config).await.unwrap();

    // Too short to be worth indexing.
    sqlx::query("INSERT INTO content_entries (key, locale, value_json) VALUES (?, ?, ?)")
        .bind("page.stub")
        .bind("en")
        .bind(r#"{"title":"x"}"#)
        .execute(&pool)
        .await
        .unwrap();

    // Locale outside the supported set.
    sqlx::query("INSERT INTO content_entries (key, locale, value_json) VALUES (?, ?, ?)")
        .bind("page.home")
        .bind("fr")
        .bind(r#"{"title":"Bienvenue","intro":"Une maison d'hôtes familiale à deux pas de la plage."}"#)
        .execute(&pool)
        .await
        .unwrap();

    let docs = load_documents(&pool, 40).await.unwrap();
    pool.close().await;

    assert!(docs.is_empty(), "noise and unknown locales must be skipped: {:?}", docs);
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let tmp = TempDir::new().unwrap();
    let config = config_for(tmp.path().join("content.sqlite"));
    run_migrations(&config).await.unwrap();
    run_migrations(&config).await.unwrap();
}
