use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::planner::{ChatOptions, ChunkStream, PlannerMessage};
use crate::runtime::Runtime;

use super::args::ChatArgs;

pub(crate) async fn handle_chat(
    args: ChatArgs,
    runtime: &Runtime,
    cancel: &CancellationToken,
) -> Result<()> {
    let prompt = args.prompt.join(" ").trim().to_owned();
    if prompt.is_empty() {
        bail!("Prompt cannot be empty");
    }

    let config = runtime.config();
    let client = runtime.client();
    let messages = [PlannerMessage::user(prompt)];
    let options = ChatOptions {
        temperature: args.temperature,
        max_tokens: args.max_tokens,
        top_p: args.top_p,
        stop: args.stop,
    };

    println!("Provider: {}", config.llm.provider.display_name());
    println!("Model: {}", client.model());
    println!();

    if args.stream {
        let mut stream = client
            .chat_stream_with_options(cancel, &messages, &options)
            .await
            .context("Streaming chat failed")?;

        return write_stream(&mut stream, cancel, &mut io::stdout()).await;
    }

    let reply = client
        .chat_with_options(cancel, &messages, &options)
        .await
        .context("Chat completion failed")?;
    println!("{}", reply.trim());

    Ok(())
}

/// Writes chunks as they arrive. The producer also closes the stream on
/// cancellation, so an ended stream is only complete if nothing was cancelled.
async fn write_stream<W: Write>(
    stream: &mut ChunkStream,
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<()> {
    while let Some(chunk) = stream.next().await {
        write!(out, "{}", chunk?)?;
        out.flush()?;
    }
    writeln!(out)?;

    if cancel.is_cancelled() {
        bail!("Streaming chat cancelled; the reply above is incomplete");
    }
    Ok(())
}
