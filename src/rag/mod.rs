//! RAG (Retrieval-Augmented Generation) for question answering over a video.
//!
//! A question is embedded, matched against the video's transcript chunks and
//! earlier answers, turned into a prompt, and answered through a streaming
//! chat model. The finished answer is embedded and stored so later questions
//! can reuse it.

mod engine;
mod generator;
mod openai;
mod prompt;
mod recorder;
mod retriever;

pub use engine::{PreparedExchange, QaEngine};
pub use generator::{
    AnswerGenerator, AnswerSink, AnswerStream, FragmentStream, GenerationModel, StreamEvent,
};
pub use openai::OpenAIGenerationModel;
pub use prompt::assemble_prompt;
pub use recorder::ConversationRecorder;
pub use retriever::{Retrieved, Retriever};
