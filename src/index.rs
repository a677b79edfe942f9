//! Offline indexing job: content store → chunks → embeddings → vector store.
//!
//! A failure at any stage aborts the whole run; this is a batch maintenance
//! job, not a serving path, and the deterministic point ids make a re-run
//! after a fix safe: upserts land on the same ids with no duplicate
//! growth.

use anyhow::Result;

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::content;
use crate::db;
use crate::embedding::Embedder;
use crate::models::{point_id, ChunkRow, Point, PointPayload, SourceDocument};
use crate::store::{QdrantStore, VectorStore};

pub struct IndexReport {
    pub documents: usize,
    pub chunks: usize,
}

/// Entry point for `concierge index`.
pub async fn run_index(config: &Config, dry_run: bool, limit: Option<usize>) -> Result<()> {
    let pool = db::connect(config).await?;
    let mut docs = content::load_documents(&pool, config.retrieval.min_doc_chars).await?;
    pool.close().await;

    if let Some(lim) = limit {
        docs.truncate(lim);
    }

    if dry_run {
        let total_chunks: usize = docs
            .iter()
            .map(|doc| {
                chunk_text(
                    &doc.text,
                    config.chunking.max_chars,
                    config.chunking.overlap_chars,
                )
                .len()
            })
            .sum();
        println!("index (dry-run)");
        println!("  documents found: {}", docs.len());
        println!("  estimated chunks: {}", total_chunks);
        return Ok(());
    }

    let embedder = Embedder::from_config(&config.embedding)?;
    let store = QdrantStore::new(&config.vector_store)?;

    let report = index_documents(
        &docs,
        &embedder,
        &store,
        config.chunking.max_chars,
        config.chunking.overlap_chars,
        config.retrieval.index_batch_size,
    )
    .await?;

    println!("index");
    println!("  documents indexed: {}", report.documents);
    println!("  chunks upserted: {}", report.chunks);
    println!("ok");
    Ok(())
}

/// Chunk, embed, and upsert a set of documents in fixed-size batches.
///
/// The collection dimension is taken from the embedding of the first chunk,
/// then the collection is ensured before any upsert.
pub async fn index_documents(
    docs: &[SourceDocument],
    embedder: &Embedder,
    store: &dyn VectorStore,
    max_chars: usize,
    overlap_chars: usize,
    batch_size: usize,
) -> Result<IndexReport> {
    let mut rows: Vec<ChunkRow> = Vec::new();
    for doc in docs {
        for (i, text) in chunk_text(&doc.text, max_chars, overlap_chars)
            .into_iter()
            .enumerate()
        {
            rows.push(ChunkRow {
                source_id: doc.source_id.clone(),
                title: doc.title.clone(),
                locale: doc.locale,
                url: doc.url.clone(),
                updated_at: doc.updated_at,
                chunk_index: i as i64,
                text,
            });
        }
    }

    if rows.is_empty() {
        return Ok(IndexReport {
            documents: docs.len(),
            chunks: 0,
        });
    }

    let probe = embedder.embed(&rows[0].text).await;
    store.ensure_collection(probe.len()).await?;

    let total = rows.len();
    let mut processed = 0usize;

    for batch in rows.chunks(batch_size) {
        let mut points = Vec::with_capacity(batch.len());
        for row in batch {
            let vector = embedder.embed(&row.text).await;
            points.push(Point {
                id: point_id(&row.source_id, row.chunk_index),
                vector,
                payload: PointPayload {
                    source_id: row.source_id.clone(),
                    title: row.title.clone(),
                    locale: row.locale,
                    url: row.url.clone(),
                    updated_at: row.updated_at,
                    chunk_index: row.chunk_index,
                    text: row.text.clone(),
                },
            });
        }
        store.upsert_points(&points).await?;
        processed += batch.len();
        println!("  indexed {}/{} chunks", processed, total);
    }

    Ok(IndexReport {
        documents: docs.len(),
        chunks: total,
    })
}
