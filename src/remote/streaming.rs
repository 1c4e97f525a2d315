//! SSE decoding for streamed responses.
//!
//! The service streams generation as server-sent events, one JSON object
//! per event: `{"chunk": <fragment>}` while generating, then
//! `{"completed": true}`.

use async_stream::try_stream;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use serde::Deserialize;
use tracing::debug;

use crate::error::VlmError;
use crate::stream::TokenStream;

/// One decoded server-sent event.
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    chunk: Option<String>,
    #[serde(default)]
    completed: bool,
}

/// Turn a streaming response body into a lazy token stream.
///
/// Each fragment is yielded as soon as its event is decoded; nothing is
/// buffered ahead of the caller. A transport or decode failure terminates
/// the stream by yielding the error at the next pull. Dropping the stream
/// drops the response and releases the connection.
pub(crate) fn token_stream(response: reqwest::Response) -> TokenStream {
    let stream = try_stream! {
        let mut events = response.bytes_stream().eventsource();
        while let Some(event) = events.next().await {
            let event = event
                .map_err(|e| VlmError::StreamError(format!("stream read failed: {e}")))?;
            if event.data.trim().is_empty() {
                continue;
            }
            let decoded: StreamChunk = serde_json::from_str(&event.data)
                .map_err(|e| VlmError::ParseError(format!("malformed stream chunk: {e}")))?;
            if let Some(fragment) = decoded.chunk {
                yield fragment;
            }
            if decoded.completed {
                debug!("stream completed");
                break;
            }
        }
    };
    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_shapes_parse() {
        let chunk: StreamChunk = serde_json::from_str(r#"{"chunk": "A dog"}"#).unwrap();
        assert_eq!(chunk.chunk.as_deref(), Some("A dog"));
        assert!(!chunk.completed);

        let done: StreamChunk = serde_json::from_str(r#"{"completed": true}"#).unwrap();
        assert!(done.chunk.is_none());
        assert!(done.completed);
    }
}
