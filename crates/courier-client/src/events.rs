//! SSE event consumer
//!
//! Connects to the live delivery stream and yields parsed `ChatEvent`s.
//! Keep-alive comment frames are skipped.

use std::pin::Pin;

use courier_realtime::ChatEvent;
use futures_util::{Stream, StreamExt};
use reqwest::StatusCode;
use uuid::Uuid;

use crate::api::ApiClient;
use crate::error::ClientError;

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<bytes::Bytes>> + Send>>;

/// A connected SSE stream of chat events
pub struct EventStream {
    inner: ByteStream,
    buffer: String,
}

impl EventStream {
    /// Open the delivery stream for a user
    pub async fn connect(client: &ApiClient, user_id: Uuid) -> Result<Self, ClientError> {
        let response = client
            .http()
            .get(client.url(&format!("/api/chat/events?userId={user_id}")))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ClientError::Api {
                status: status.as_u16(),
                code: "STREAM_ERROR".to_string(),
                message: format!("Event stream returned {status}"),
            });
        }

        Ok(Self {
            inner: Box::pin(response.bytes_stream()),
            buffer: String::new(),
        })
    }

    /// The next event, or `None` when the server closed the stream
    pub async fn next_event(&mut self) -> Result<Option<ChatEvent>, ClientError> {
        loop {
            if let Some(event) = self.pop_frame()? {
                return Ok(Some(event));
            }

            match self.inner.next().await {
                Some(Ok(chunk)) => self.buffer.push_str(&String::from_utf8_lossy(&chunk)),
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(None),
            }
        }
    }

    /// Pop one complete `data:` frame off the buffer, skipping comments
    fn pop_frame(&mut self) -> Result<Option<ChatEvent>, ClientError> {
        while let Some(end) = self.buffer.find("\n\n") {
            let frame = self.buffer[..end].to_string();
            self.buffer.drain(..end + 2);

            let data: Vec<&str> = frame
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(str::trim_start)
                .collect();

            if data.is_empty() {
                // Comment/keep-alive frame
                continue;
            }

            let event = serde_json::from_str(&data.join("\n"))?;
            return Ok(Some(event));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn stream_of(frames: &[&str]) -> EventStream {
        let chunks: Vec<reqwest::Result<bytes::Bytes>> = frames
            .iter()
            .map(|f| Ok(bytes::Bytes::copy_from_slice(f.as_bytes())))
            .collect();
        EventStream {
            inner: Box::pin(stream::iter(chunks)),
            buffer: String::new(),
        }
    }

    #[tokio::test]
    async fn test_parses_connected_frame() {
        let user_id = Uuid::new_v4();
        let mut events = stream_of(&[&format!(
            "data: {{\"type\":\"connected\",\"userId\":\"{user_id}\"}}\n\n"
        )]);

        let event = events.next_event().await.unwrap().unwrap();
        assert_eq!(event, ChatEvent::connected(user_id));
        assert!(events.next_event().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_skips_keep_alive_comments() {
        let user_id = Uuid::new_v4();
        let mut events = stream_of(&[
            ": keep-alive\n\n",
            &format!("data: {{\"type\":\"connected\",\"userId\":\"{user_id}\"}}\n\n"),
        ]);

        let event = events.next_event().await.unwrap().unwrap();
        assert_eq!(event, ChatEvent::connected(user_id));
    }

    #[tokio::test]
    async fn test_handles_frames_split_across_chunks() {
        let user_id = Uuid::new_v4();
        let frame = format!("data: {{\"type\":\"connected\",\"userId\":\"{user_id}\"}}\n\n");
        let (a, b) = frame.split_at(10);
        let mut events = stream_of(&[a, b]);

        let event = events.next_event().await.unwrap().unwrap();
        assert_eq!(event, ChatEvent::connected(user_id));
    }

    #[tokio::test]
    async fn test_invalid_payload_is_an_error() {
        let mut events = stream_of(&["data: {not json}\n\n"]);
        assert!(events.next_event().await.is_err());
    }
}
