//! Retrieval-augmented question answering.
//!
//! [`QaEngine`] composes the embedder, vector index, prompt template, and
//! answer generator into a single `ask(question)` operation. The engine is
//! stateless per request: embed the question, retrieve the top-k chunks,
//! render the prompt, generate, then attach a "Sources Consulted" suffix.
//!
//! `ask` never fails. Any error along the way (retrieval, generation,
//! provider outage) is converted into an `Error: ...` answer string so the
//! question channel always receives a payload.

use std::sync::Arc;

use anyhow::Result;

use crate::embedding::{embed_query, Embedder};
use crate::generate::AnswerGenerator;
use crate::models::Answer;
use crate::store::VectorIndex;

/// Prompt rendered for every question. Instructs the model to be concise,
/// to answer exactly "I don't know" when the context is insufficient, and to
/// lean only on directly-relevant sources.
const PROMPT_TEMPLATE: &str = "Use the below context to answer questions. Follow these rules:
1. Be concise.
2. If you don't have enough information, say \"I don't know\" without guessing.
3. Include only the sources that directly contribute to your answer.
Context:
{context}
Question: {question}
Answer:";

/// The literal refusal the prompt asks for. Answers equal to this (after
/// trimming provider whitespace) get no sources suffix.
const DONT_KNOW: &str = "I don't know";

pub struct QaEngine {
    index: VectorIndex,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn AnswerGenerator>,
    top_k: usize,
}

impl QaEngine {
    pub fn new(
        index: VectorIndex,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn AnswerGenerator>,
        top_k: usize,
    ) -> Self {
        Self {
            index,
            embedder,
            generator,
            top_k,
        }
    }

    /// Answer a question. Infallible: errors become `Error: ...` payloads.
    pub async fn ask(&self, question: &str) -> String {
        match self.answer(question).await {
            Ok(answer) => format_answer(&answer),
            Err(e) => format!("Error: {}", e),
        }
    }

    /// The fallible pipeline behind [`ask`](Self::ask).
    async fn answer(&self, question: &str) -> Result<Answer> {
        let query_vector = embed_query(self.embedder.as_ref(), question).await?;
        let retrieved = self.index.search(&query_vector, self.top_k).await?;

        let context = retrieved
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = PROMPT_TEMPLATE
            .replace("{context}", &context)
            .replace("{question}", question);

        let text = self.generator.generate(&prompt).await?;

        // Distinct source filenames in retrieval order.
        let mut sources: Vec<String> = Vec::new();
        for hit in &retrieved {
            if !hit.file_name.is_empty() && !sources.contains(&hit.file_name) {
                sources.push(hit.file_name.clone());
            }
        }

        Ok(Answer { text, sources })
    }
}

/// Apply the answer formatting contract: a sources suffix for substantive
/// answers, and the `Answer: ` prefix for everything that is not an error.
fn format_answer(answer: &Answer) -> String {
    let mut text = answer.text.trim().to_string();

    if text != DONT_KNOW && !answer.sources.is_empty() {
        text.push_str(&format!(
            "\n\n|| Sources Consulted: {}",
            answer.sources.join(", ")
        ));
    }

    format!("Answer: {}", text)
}
