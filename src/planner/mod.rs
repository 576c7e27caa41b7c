//! Planner contract: the conversational model the planner-driven chain
//! consults each iteration, and the single JSON action protocol it speaks.

mod error;
mod parsing;
mod prompt;
mod types;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

pub use error::{PlannerError, ProtocolError};
pub use parsing::parse_action;
pub(crate) use parsing::{extract_json_array, extract_json_object};
pub use prompt::render_system_prompt;
pub use types::{ChatOptions, PlannedAction, PlannerMessage, Role};

/// Capacity of the chunk queue between a streaming producer and its consumer.
pub const STREAM_BUFFER: usize = 100;

/// Finite, non-restartable sequence of text chunks from a streaming chat.
pub type ChunkStream = ReceiverStream<Result<String, PlannerError>>;

#[async_trait]
pub trait PlannerClient: Send + Sync {
    async fn chat(
        &self,
        cancel: &CancellationToken,
        messages: &[PlannerMessage],
    ) -> Result<String, PlannerError>;

    /// Streams the reply as text chunks. Clients without a streaming transport
    /// yield the whole `chat` reply as a single chunk.
    async fn chat_stream(
        &self,
        cancel: &CancellationToken,
        messages: &[PlannerMessage],
    ) -> Result<ChunkStream, PlannerError> {
        let reply = self.chat(cancel, messages).await?;
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.try_send(Ok(reply));
        Ok(ReceiverStream::new(rx))
    }
}
