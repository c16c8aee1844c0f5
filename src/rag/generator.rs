//! Streaming answer generation and the events delivered to callers.

use crate::error::{Result, TubeqaError};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// Text fragments of one generated answer, in order.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Trait for streaming text-generation backends.
#[async_trait]
pub trait GenerationModel: Send + Sync {
    /// Start generating an answer to `prompt`.
    async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream>;
}

/// One event delivered to the asker during an exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Fragment {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Done {
        question_answer_id: i64,
        most_relevant_timestamp: f64,
    },
    Error {
        message: String,
    },
}

impl StreamEvent {
    /// Short name of the event, used as the SSE event field.
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Fragment { .. } => "fragment",
            StreamEvent::Done { .. } => "done",
            StreamEvent::Error { .. } => "error",
        }
    }
}

/// Receiver of exchange events.
///
/// An error from `emit` means the receiver is gone and the exchange should stop.
#[async_trait]
pub trait AnswerSink: Send {
    async fn emit(&mut self, event: StreamEvent) -> Result<()>;

    /// Resolves once the receiver is gone. Sinks that cannot tell never resolve.
    async fn disconnected(&mut self) {
        futures::future::pending::<()>().await
    }
}

#[async_trait]
impl AnswerSink for mpsc::Sender<StreamEvent> {
    async fn emit(&mut self, event: StreamEvent) -> Result<()> {
        self.send(event)
            .await
            .map_err(|_| TubeqaError::Cancelled("Client disconnected".to_string()))
    }

    async fn disconnected(&mut self) {
        mpsc::Sender::closed(self).await
    }
}

#[async_trait]
impl AnswerSink for Vec<StreamEvent> {
    async fn emit(&mut self, event: StreamEvent) -> Result<()> {
        self.push(event);
        Ok(())
    }
}

/// Opens generation streams with a deadline.
pub struct AnswerGenerator {
    model: Arc<dyn GenerationModel>,
    timeout: Duration,
}

impl AnswerGenerator {
    /// Create a generator with a 120 second deadline.
    pub fn new(model: Arc<dyn GenerationModel>) -> Self {
        Self {
            model,
            timeout: Duration::from_secs(120),
        }
    }

    /// Set the deadline for a whole generation, opening included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Open a generation stream for `prompt`.
    pub async fn open(&self, prompt: &str) -> Result<AnswerStream> {
        let deadline = Instant::now() + self.timeout;
        let fragments = tokio::time::timeout_at(deadline, self.model.generate_stream(prompt))
            .await
            .map_err(|_| {
                TubeqaError::Upstream(format!("Generation did not start within {:?}", self.timeout))
            })??;

        Ok(AnswerStream { fragments, deadline })
    }
}

/// An open generation that has not delivered anything yet.
pub struct AnswerStream {
    fragments: FragmentStream,
    deadline: Instant,
}

impl AnswerStream {
    /// Forward every fragment to `sink` and return the accumulated answer.
    ///
    /// Each fragment is emitted before it is appended. Empty fragments are
    /// skipped. A stream error or the deadline passing ends the loop with an
    /// error and the partial answer is dropped. A sink that disconnects while
    /// the model is silent cancels the exchange without waiting for the next
    /// fragment.
    #[instrument(skip_all)]
    pub async fn forward(mut self, sink: &mut dyn AnswerSink) -> Result<String> {
        let mut answer = String::new();
        let mut fragments = 0usize;

        loop {
            let next = tokio::select! {
                next = tokio::time::timeout_at(self.deadline, self.fragments.next()) => {
                    next.map_err(|_| TubeqaError::Upstream("Generation timed out".to_string()))?
                }
                _ = sink.disconnected() => {
                    return Err(TubeqaError::Cancelled("Client disconnected".to_string()));
                }
            };

            match next {
                Some(Ok(text)) => {
                    if text.is_empty() {
                        continue;
                    }
                    sink.emit(StreamEvent::Fragment { text: text.clone() }).await?;
                    answer.push_str(&text);
                    fragments += 1;
                }
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }

        debug!("Forwarded {} fragments ({} bytes)", fragments, answer.len());
        Ok(answer)
    }
}
