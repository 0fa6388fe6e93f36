//! Retrieval-augmented answering: retrieve, assemble the prompt, generate.

use anyhow::Result;

use crate::document::DocumentMetadata;
use crate::embedder::Embedder;
use crate::generation::{GenerationConfig, LlmProvider, ProviderRequest};
use crate::retriever::{RetrievedChunk, Retriever, RetrieverConfig};
use crate::vector_store::Collection;

/// Instructions sent as the system turn of every request.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant answering questions about Linux, free software, \
and related topics using the provided context. \
Always answer in Persian, be concise, and the answers must be short (<= 4 words). \
If a query expects only a number, return only the number (no percentage sign or extras). ";

/// Marker placed between retrieved texts in the prompt.
pub const CONTEXT_SEPARATOR: &str = "\n\n-----\n\n";

/// Anything that can answer a free-text question.
pub trait QuestionAnswerer {
    /// Returns the answer text for `question`.
    fn answer(&self, question: &str) -> Result<String>;
}

/// Answer plus the chunks it was grounded on.
#[derive(Debug, Clone, PartialEq)]
pub struct RagAnswer {
    /// Generated answer.
    pub answer: String,
    /// Metadata of the retrieved chunks, best first.
    pub sources: Vec<DocumentMetadata>,
}

/// Retriever and chat provider composed into one callable.
pub struct RagChain {
    retriever: Retriever,
    provider: Box<dyn LlmProvider>,
    temperature: f32,
    max_tokens: usize,
}

/// Binds a loaded collection to the embedder it was built with.
pub fn build_retriever(
    collection: Collection,
    embedder: Box<dyn Embedder>,
    config: RetrieverConfig,
) -> Retriever {
    Retriever::new(collection, embedder, config)
}

/// Composes the answering chain.
pub fn build_rag_chain(
    retriever: Retriever,
    provider: Box<dyn LlmProvider>,
    generation: &GenerationConfig,
) -> RagChain {
    RagChain {
        retriever,
        provider,
        temperature: generation.temperature,
        max_tokens: generation.max_tokens,
    }
}

impl RagChain {
    /// Retrieves context for `question` and asks the model. Embedding and
    /// generation errors are returned as they came from the provider.
    pub fn invoke(&self, question: &str) -> Result<RagAnswer> {
        let retrieved = self.retriever.fetch(question)?;
        let context = format_docs(&retrieved);
        let prompt = human_prompt(question, &context);
        let answer = self.provider.answer(&ProviderRequest {
            system: SYSTEM_PROMPT,
            prompt: &prompt,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        })?;
        Ok(RagAnswer {
            answer: answer.trim().to_string(),
            sources: retrieved.into_iter().map(|r| r.chunk.metadata).collect(),
        })
    }

    /// The chain's retriever.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }
}

impl QuestionAnswerer for RagChain {
    fn answer(&self, question: &str) -> Result<String> {
        self.invoke(question).map(|answer| answer.answer)
    }
}

/// Convenience wrapper returning only the answer text.
pub fn answer_question(chain: &dyn QuestionAnswerer, question: &str) -> Result<String> {
    chain.answer(question)
}

/// Joins retrieved texts with [`CONTEXT_SEPARATOR`].
pub fn format_docs(docs: &[RetrievedChunk]) -> String {
    docs.iter()
        .map(|doc| doc.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// User turn carrying the question and the retrieved context.
pub fn human_prompt(question: &str, context: &str) -> String {
    format!(
        "سوال:\n{question}\n\nمتن‌های بازیابی‌شده:\n{context}\n\nپاسخ کوتاه را فقط بر اساس متن‌های بالا تولید کن."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Chunk, Document, SourceKind};
    use pretty_assertions::assert_eq;

    fn retrieved(text: &str) -> RetrievedChunk {
        let doc = Document::new(text.to_string(), SourceKind::Wikipedia, "w", None, None);
        RetrievedChunk {
            chunk: Chunk {
                text: text.to_string(),
                metadata: doc.metadata,
                chunk_index: 0,
                start: 0,
            },
            distance: 0.1,
        }
    }

    #[test]
    fn docs_are_joined_with_separator() {
        let joined = format_docs(&[retrieved("الف"), retrieved("ب")]);
        assert_eq!(joined, "الف\n\n-----\n\nب");
        assert_eq!(format_docs(&[]), "");
    }

    #[test]
    fn prompt_places_question_before_context() {
        let prompt = human_prompt("لینوکس چیست؟", "متن");
        assert!(prompt.starts_with("سوال:\nلینوکس چیست؟\n\n"));
        assert!(prompt.contains("متن‌های بازیابی‌شده:\nمتن\n\n"));
        assert!(prompt.ends_with("تولید کن."));
    }

    #[test]
    fn system_prompt_limits_answer_length() {
        assert!(SYSTEM_PROMPT.contains("<= 4 words"));
        assert!(SYSTEM_PROMPT.contains("Persian"));
    }
}
