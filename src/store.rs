//! Persistent vector index backed by a single SQLite file.
//!
//! Each row is one embedding record: (vector BLOB, chunk text, source
//! filename). Similarity search is a brute-force cosine scan over all rows —
//! adequate for the corpus sizes this server targets, and trivially
//! deterministic: results order by descending similarity with ties broken by
//! ascending rowid (insertion order).
//!
//! Inserts are transactional, so the index on disk is durable as soon as
//! [`VectorIndex::add`] returns; there is no separate save step. Opening a
//! corrupt or foreign file fails loudly so the process never serves a broken
//! index.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{EmbeddedChunk, Retrieved};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS records (
    id TEXT PRIMARY KEY,
    file_name TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    text TEXT NOT NULL,
    embedding BLOB NOT NULL,
    created_at INTEGER NOT NULL
)";

/// Handle to the on-disk vector index.
///
/// Cloneable and cheap to share across request handlers; writers must
/// serialize externally (see the server's single-writer lock).
#[derive(Clone)]
pub struct VectorIndex {
    pool: SqlitePool,
}

impl VectorIndex {
    /// Create a fresh index file at `path` (parent directories included).
    pub async fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let pool = connect(path, true).await?;
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Open an existing index file.
    ///
    /// Fails if the file is missing, is not a SQLite database, or lacks the
    /// records table. Deserialization failure is fatal at startup by design.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Index file not found: {}", path.display());
        }

        let pool = connect(path, false).await?;
        sqlx::query("SELECT COUNT(*) FROM records")
            .fetch_one(&pool)
            .await
            .with_context(|| {
                format!(
                    "Persisted index at {} is corrupt or incompatible",
                    path.display()
                )
            })?;

        Ok(Self { pool })
    }

    /// Append embedding records. Durable once the transaction commits.
    pub async fn add(&self, records: &[EmbeddedChunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now().timestamp();

        for record in records {
            sqlx::query(
                "INSERT INTO records (id, file_name, chunk_index, text, embedding, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&record.chunk.file_name)
            .bind(record.chunk.chunk_index)
            .bind(&record.chunk.text)
            .bind(vec_to_blob(&record.vector))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Return the `k` most similar records to `query_vector`.
    ///
    /// Ordered by descending cosine similarity; equal scores keep insertion
    /// order. Records whose stored vector has a different dimensionality
    /// score 0 rather than erroring.
    pub async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<Retrieved>> {
        let rows = sqlx::query(
            "SELECT rowid, file_name, text, embedding FROM records ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<(i64, Retrieved)> = rows
            .iter()
            .map(|row| {
                let rowid: i64 = row.get("rowid");
                let blob: Vec<u8> = row.get("embedding");
                let vector = blob_to_vec(&blob);
                let hit = Retrieved {
                    file_name: row.get("file_name"),
                    text: row.get("text"),
                    score: cosine_similarity(query_vector, &vector),
                };
                (rowid, hit)
            })
            .collect();

        scored.sort_by(|(a_id, a), (b_id, b)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a_id.cmp(b_id))
        });
        scored.truncate(k);

        Ok(scored.into_iter().map(|(_, hit)| hit).collect())
    }

    /// Number of records in the index.
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM records")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Close the underlying pool. Used by tests that reopen the same file.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn connect(path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
        .create_if_missing(create)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open index at {}", path.display()))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;
    use tempfile::TempDir;

    fn record(file_name: &str, index: i64, text: &str, vector: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk {
            chunk: Chunk {
                file_name: file_name.to_string(),
                chunk_index: index,
                text: text.to_string(),
            },
            vector,
        }
    }

    #[tokio::test]
    async fn create_add_search_orders_by_similarity() {
        let tmp = TempDir::new().unwrap();
        let index = VectorIndex::create(&tmp.path().join("index.sqlite"))
            .await
            .unwrap();

        index
            .add(&[
                record("a.pdf", 0, "about cats", vec![1.0, 0.0, 0.0]),
                record("b.pdf", 0, "about dogs", vec![0.0, 1.0, 0.0]),
                record("c.pdf", 0, "about birds", vec![0.7, 0.7, 0.0]),
            ])
            .await
            .unwrap();

        let hits = index.search(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].file_name, "a.pdf");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].file_name, "c.pdf");
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn equal_scores_keep_insertion_order() {
        let tmp = TempDir::new().unwrap();
        let index = VectorIndex::create(&tmp.path().join("index.sqlite"))
            .await
            .unwrap();

        // Identical vectors: both score 1.0 against the query.
        index
            .add(&[
                record("first.pdf", 0, "x", vec![1.0, 0.0]),
                record("second.pdf", 0, "y", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let hits = index.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits[0].file_name, "first.pdf");
        assert_eq!(hits[1].file_name, "second.pdf");
    }

    #[tokio::test]
    async fn reload_yields_identical_results() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.sqlite");

        let index = VectorIndex::create(&path).await.unwrap();
        index
            .add(&[
                record("a.pdf", 0, "alpha", vec![0.9, 0.1]),
                record("b.pdf", 0, "beta", vec![0.1, 0.9]),
            ])
            .await
            .unwrap();
        let before = index.search(&[1.0, 0.0], 2).await.unwrap();
        index.close().await;

        let reopened = VectorIndex::load(&path).await.unwrap();
        let after = reopened.search(&[1.0, 0.0], 2).await.unwrap();

        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(after.iter()) {
            assert_eq!(b.file_name, a.file_name);
            assert_eq!(b.text, a.text);
            assert_eq!(b.score, a.score);
        }
    }

    #[tokio::test]
    async fn load_missing_file_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(VectorIndex::load(&tmp.path().join("absent.sqlite"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn load_corrupt_file_fails() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.sqlite");
        std::fs::write(&path, b"this is not a sqlite database, not even close").unwrap();
        assert!(VectorIndex::load(&path).await.is_err());
    }

    #[tokio::test]
    async fn mismatched_dims_score_zero_instead_of_erroring() {
        let tmp = TempDir::new().unwrap();
        let index = VectorIndex::create(&tmp.path().join("index.sqlite"))
            .await
            .unwrap();

        index
            .add(&[record("short.pdf", 0, "short vector", vec![1.0])])
            .await
            .unwrap();

        let hits = index.search(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(hits[0].score, 0.0);
    }

    #[tokio::test]
    async fn count_reflects_additions() {
        let tmp = TempDir::new().unwrap();
        let index = VectorIndex::create(&tmp.path().join("index.sqlite"))
            .await
            .unwrap();
        assert_eq!(index.count().await.unwrap(), 0);

        index
            .add(&[record("a.pdf", 0, "one", vec![1.0])])
            .await
            .unwrap();
        assert_eq!(index.count().await.unwrap(), 1);
    }
}
