//! Answer synthesis
//!
//! Builds a grounding prompt from the question and retrieved passages (in
//! retrieval order, most relevant first) and calls the completion service
//! once. An empty passage set still produces an answer: the prompt states
//! that nothing relevant was retrieved and the model is instructed to say
//! so, because the caller always expects a string per question.

use std::sync::Arc;

use docqa_core::{CompletionClient, Result};
use docqa_vector::ScoredChunk;

// ============================================================================
// Prompt Builder
// ============================================================================

/// Builder for grounding prompts
pub struct PromptBuilder {
    system_instruction: String,
    context_sections: Vec<String>,
    question: String,
    instructions: Vec<String>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            system_instruction: String::new(),
            context_sections: Vec::new(),
            question: String::new(),
            instructions: Vec::new(),
        }
    }

    /// Set system instruction
    pub fn system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    /// Add a context section
    pub fn add_context(mut self, context: impl Into<String>) -> Self {
        self.context_sections.push(context.into());
        self
    }

    /// Set the question
    pub fn question(mut self, q: impl Into<String>) -> Self {
        self.question = q.into();
        self
    }

    /// Add an instruction
    pub fn add_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instructions.push(instruction.into());
        self
    }

    /// Build the final prompt
    pub fn build(self) -> String {
        let mut prompt = String::new();

        if !self.system_instruction.is_empty() {
            prompt.push_str("<s>\n");
            prompt.push_str(&self.system_instruction);
            prompt.push_str("\n</s>\n\n");
        }

        if !self.context_sections.is_empty() {
            prompt.push_str("<context>\n");
            for section in &self.context_sections {
                prompt.push_str(section);
                prompt.push_str("\n\n");
            }
            prompt.push_str("</context>\n\n");
        }

        if !self.question.is_empty() {
            prompt.push_str("<question>\n");
            prompt.push_str(&self.question);
            prompt.push_str("\n</question>\n\n");
        }

        if !self.instructions.is_empty() {
            prompt.push_str("<instructions>\n");
            for (i, inst) in self.instructions.iter().enumerate() {
                prompt.push_str(&format!("{}. {}\n", i + 1, inst));
            }
            prompt.push_str("</instructions>\n");
        }

        prompt
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Synthesizer
// ============================================================================

/// Generates grounded answers from retrieved passages
pub struct AnswerSynthesizer {
    llm: Arc<dyn CompletionClient>,
    max_context_chars: usize,
}

impl AnswerSynthesizer {
    pub fn new(llm: Arc<dyn CompletionClient>, max_context_chars: usize) -> Self {
        Self {
            llm,
            max_context_chars,
        }
    }

    /// Produce an answer for the question, grounded on the passages
    pub async fn synthesize(&self, question: &str, passages: &[ScoredChunk]) -> Result<String> {
        let prompt = self.build_prompt(question, passages);

        tracing::debug!(
            prompt_chars = prompt.len(),
            passages = passages.len(),
            "calling completion service"
        );
        let raw = self.llm.generate(&prompt).await?;

        Ok(normalize_answer(&raw))
    }

    fn build_prompt(&self, question: &str, passages: &[ScoredChunk]) -> String {
        let mut builder = PromptBuilder::new()
            .system(
                "You are an expert document analyst. Answer the question using only \
                 the provided passages from the document.",
            )
            .question(question)
            .add_instruction("Provide a direct, factual answer based only on the provided passages.")
            .add_instruction("Be specific about numbers, timeframes, percentages, and conditions.")
            .add_instruction("Keep the answer concise but complete.")
            .add_instruction("Do not add explanations or interpretations beyond what is stated.");

        if passages.is_empty() {
            builder = builder
                .add_context("No passages relevant to the question were retrieved from the document.")
                .add_instruction(
                    "State clearly that the information is not available in the provided document.",
                );
        } else {
            let mut total_length = 0;
            for (i, passage) in passages.iter().enumerate() {
                if total_length + passage.content.len() > self.max_context_chars {
                    break;
                }
                total_length += passage.content.len();
                builder = builder.add_context(format!("Passage {}: {}", i + 1, passage.content));
            }
            builder = builder.add_instruction(
                "If the information is not in the passages, say \
                 \"Information not available in the provided document\".",
            );
        }

        builder.build()
    }
}

/// Trim the model output and strip a single pair of wrapping quotes
fn normalize_answer(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingLlm {
        prompts: Mutex<Vec<String>>,
        reply: String,
    }

    impl RecordingLlm {
        fn new(reply: &str) -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                reply: reply.to_string(),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for RecordingLlm {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    fn scored(content: &str, score: f32, chunk_index: u32) -> ScoredChunk {
        ScoredChunk {
            content: content.to_string(),
            score,
            chunk_index,
        }
    }

    #[test]
    fn test_prompt_builder_sections() {
        let prompt = PromptBuilder::new()
            .system("You are a helpful assistant.")
            .add_context("Passage 1: first")
            .add_context("Passage 2: second")
            .question("What is the answer?")
            .add_instruction("Be concise")
            .build();

        assert!(prompt.contains("<s>"));
        assert!(prompt.contains("<context>"));
        assert!(prompt.contains("What is the answer?"));
        assert!(prompt.contains("1. Be concise"));
    }

    #[tokio::test]
    async fn test_passages_appear_in_retrieval_order() {
        let llm = Arc::new(RecordingLlm::new("an answer"));
        let synthesizer = AnswerSynthesizer::new(llm.clone(), 8000);

        let passages = vec![scored("most relevant", 0.9, 4), scored("less relevant", 0.6, 1)];
        synthesizer.synthesize("question?", &passages).await.unwrap();

        let prompt = llm.prompts.lock().unwrap()[0].clone();
        let first = prompt.find("Passage 1: most relevant").unwrap();
        let second = prompt.find("Passage 2: less relevant").unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_empty_passages_still_answer() {
        let llm = Arc::new(RecordingLlm::new("Information not available"));
        let synthesizer = AnswerSynthesizer::new(llm.clone(), 8000);

        let answer = synthesizer.synthesize("question?", &[]).await.unwrap();
        assert!(!answer.is_empty());

        let prompt = llm.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("No passages relevant to the question were retrieved"));
    }

    #[tokio::test]
    async fn test_context_budget_truncates_passages() {
        let llm = Arc::new(RecordingLlm::new("ok"));
        let synthesizer = AnswerSynthesizer::new(llm.clone(), 20);

        let passages = vec![scored("short text", 0.9, 0), scored("this one does not fit", 0.8, 1)];
        synthesizer.synthesize("q", &passages).await.unwrap();

        let prompt = llm.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("Passage 1: short text"));
        assert!(!prompt.contains("Passage 2"));
    }

    #[test]
    fn test_normalize_answer_strips_quotes() {
        assert_eq!(normalize_answer("\"quoted answer\"\n"), "quoted answer");
        assert_eq!(normalize_answer("  plain answer "), "plain answer");
        assert_eq!(normalize_answer("\"unbalanced"), "\"unbalanced");
    }
}
