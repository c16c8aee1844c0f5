//! Prompt assembly.

use crate::vector_store::{ScoredChunk, ScoredQuestionAnswer};

/// Build the generation prompt from retrieved context and the question.
///
/// Chunk texts are joined with single spaces in the order given. The block of
/// previous answers is left out entirely when there are none.
pub fn assemble_prompt(
    chunks: &[ScoredChunk],
    qa_history: &[ScoredQuestionAnswer],
    question: &str,
) -> String {
    let context = chunks
        .iter()
        .map(|c| c.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let previous = if qa_history.is_empty() {
        String::new()
    } else {
        let pairs = qa_history
            .iter()
            .map(|q| {
                format!(
                    "Question: {}\nAnswer: {}",
                    q.question_answer.question, q.question_answer.answer
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        format!(
            "Previous relevant information from our conversation:\n{}\n\n",
            pairs
        )
    };

    format!(
        "Here is context of the video:\n{}\n\n{}Question: {}\n\nAnswer the question and relate it to the video.",
        context, previous, question
    )
}
