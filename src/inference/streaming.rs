//! Streamed completion decoding
//!
//! The event-source layer hands over one `data:` payload per message; this
//! module turns those payloads into content deltas and stops at `[DONE]`.

use futures::stream::{self, Stream, StreamExt};
use reqwest_eventsource::Event;
use serde::Deserialize;

use crate::inference::{DeltaStream, InferenceError};

/// Sentinel payload that closes an OpenAI stream
const DONE: &str = "[DONE]";

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// Content delta carried by one stream chunk, if any
pub fn delta_content(payload: &str) -> Result<Option<String>, InferenceError> {
    let chunk: ChunkPayload =
        serde_json::from_str(payload).map_err(|e| InferenceError::Malformed(e.to_string()))?;

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta)
        .and_then(|d| d.content)
        .filter(|text| !text.is_empty()))
}

/// Turn server-sent events into a stream of content deltas
///
/// The stream ends after `[DONE]`, when the server closes the connection, or
/// right after the first error. The event source is dropped at that point, so
/// it never reconnects.
pub fn delta_stream<S>(events: S) -> DeltaStream
where
    S: Stream<Item = Result<Event, reqwest_eventsource::Error>> + Send + 'static,
{
    stream::unfold(Some(events.boxed()), |events| async move {
        let mut events = events?;
        loop {
            match events.next().await? {
                Ok(Event::Open) => continue,
                Ok(Event::Message(message)) => {
                    if message.data.trim() == DONE {
                        return None;
                    }
                    match delta_content(&message.data) {
                        Ok(Some(text)) => return Some((Ok(text), Some(events))),
                        Ok(None) => continue,
                        Err(e) => return Some((Err(e), None)),
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => return None,
                Err(e) => return Some((Err(e.into()), None)),
            }
        }
    })
    .boxed()
}
