//! Indexing pipeline orchestration.
//!
//! Coordinates the document flow: PDF folder → extraction → chunking →
//! embedding → vector index. Used at startup (build or load the index) and
//! per upload (incremental extension).

use anyhow::{Context, Result};
use std::path::Path;

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::embedding::Embedder;
use crate::extract::extract_pdf_text;
use crate::models::{Chunk, EmbeddedChunk};
use crate::store::VectorIndex;

/// Text extracted from one PDF on disk.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub file_name: String,
    pub text: String,
}

/// Read every `*.pdf` directly inside `folder` (created if absent, no
/// recursion) and extract its text. Non-PDF files are ignored; the suffix
/// check is case-sensitive lowercase, matching the upload endpoint.
///
/// An unreadable PDF aborts the whole load.
pub fn load_documents(folder: &Path) -> Result<Vec<LoadedDocument>> {
    std::fs::create_dir_all(folder)
        .with_context(|| format!("Failed to create PDF folder: {}", folder.display()))?;

    let mut entries: Vec<_> = std::fs::read_dir(folder)?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .filter(|e| e.path().is_file())
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let mut documents = Vec::new();
    for entry in entries {
        let file_name = entry.file_name().to_string_lossy().to_string();
        if !file_name.ends_with(".pdf") {
            continue;
        }

        let bytes = std::fs::read(entry.path())?;
        let text = extract_pdf_text(&bytes)
            .with_context(|| format!("Failed to extract text from {}", file_name))?;
        documents.push(LoadedDocument { file_name, text });
    }

    Ok(documents)
}

/// Chunk a set of loaded documents with the configured parameters.
pub fn chunk_documents(documents: &[LoadedDocument], config: &Config) -> Vec<Chunk> {
    documents
        .iter()
        .flat_map(|doc| {
            chunk_text(
                &doc.file_name,
                &doc.text,
                config.chunking.chunk_size,
                config.chunking.overlap,
            )
        })
        .collect()
}

/// Embed chunks in one batch, pairing each with its vector.
pub async fn embed_chunks(
    embedder: &dyn Embedder,
    chunks: Vec<Chunk>,
) -> Result<Vec<EmbeddedChunk>> {
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder.embed(&texts).await?;

    if vectors.len() != chunks.len() {
        anyhow::bail!(
            "Embedder returned {} vectors for {} chunks",
            vectors.len(),
            chunks.len()
        );
    }

    Ok(chunks
        .into_iter()
        .zip(vectors)
        .map(|(chunk, vector)| EmbeddedChunk { chunk, vector })
        .collect())
}

/// Startup path: load the persisted index if one exists at the configured
/// path, otherwise build a fresh one from the PDF folder and persist it.
///
/// A folder with no PDFs (or PDFs with no text) still produces a valid
/// index: one empty-filename placeholder record is embedded so the index is
/// never vectorless. A corrupt persisted index is a fatal error.
pub async fn build_or_load_index(config: &Config, embedder: &dyn Embedder) -> Result<VectorIndex> {
    if config.index.path.exists() {
        let index = VectorIndex::load(&config.index.path).await?;
        println!(
            "Loaded index from {} ({} records)",
            config.index.path.display(),
            index.count().await?
        );
        return Ok(index);
    }

    let documents = load_documents(&config.documents.path)?;
    let mut chunks = chunk_documents(&documents, config);
    if chunks.is_empty() {
        chunks.push(Chunk {
            file_name: String::new(),
            chunk_index: 0,
            text: String::new(),
        });
    }

    let records = embed_chunks(embedder, chunks).await?;
    let index = VectorIndex::create(&config.index.path).await?;
    index.add(&records).await?;

    println!(
        "Built index at {} from {} PDF(s), {} record(s)",
        config.index.path.display(),
        documents.len(),
        records.len()
    );
    Ok(index)
}

/// Upload path: extract, chunk, embed, and append one PDF's content to the
/// index. Returns the number of records added. The caller has already saved
/// the file to the PDF folder; a failure here leaves the file on disk with
/// no index records (no rollback).
pub async fn update_index_with_pdf(
    index: &VectorIndex,
    embedder: &dyn Embedder,
    config: &Config,
    file_name: &str,
    bytes: &[u8],
) -> Result<usize> {
    let text = extract_pdf_text(bytes)
        .with_context(|| format!("Failed to extract text from {}", file_name))?;

    let chunks = chunk_text(
        file_name,
        &text,
        config.chunking.chunk_size,
        config.chunking.overlap,
    );
    if chunks.is_empty() {
        return Ok(0);
    }

    let records = embed_chunks(embedder, chunks).await?;
    index.add(&records).await?;
    Ok(records.len())
}
