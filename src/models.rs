//! Core data models used throughout pdfqa.
//!
//! These types represent the chunks, embedding records, and answers that flow
//! through the indexing and question-answering pipeline.

/// A bounded span of extracted PDF text, the unit of embedding and retrieval.
///
/// Chunks carry the filename of the PDF they came from so that answers can
/// cite their sources. They are created by the chunker and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Filename of the source PDF (no directory components).
    pub file_name: String,
    /// Position of this chunk within its document, contiguous from 0.
    pub chunk_index: i64,
    /// The chunk text.
    pub text: String,
}

/// A chunk paired with its embedding vector, ready for storage.
///
/// Invariant: the vector was produced by the same embedder configuration
/// used for queries. Mixing embedding models silently corrupts retrieval.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// A search hit returned by the vector index.
///
/// Hits are ordered by descending cosine similarity; ties are broken by
/// ascending insertion order (rowid), so result order is deterministic.
#[derive(Debug, Clone)]
pub struct Retrieved {
    pub file_name: String,
    pub text: String,
    pub score: f32,
}

/// A generated answer plus the filenames whose chunks backed it.
///
/// `sources` is deduplicated by first appearance, preserving retrieval order.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<String>,
}
