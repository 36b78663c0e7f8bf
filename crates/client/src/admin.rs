use anyhow::{anyhow, Result};
use encore_core::{ClientMessage, ServerMessage, ShowStateUpdate};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Writer-side client: connects, claims the writer capability, then edits
/// and triggers the show. Intended for tooling and integration tests; the
/// production writer is the admin UI speaking the same protocol.
pub struct AdminClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl AdminClient {
    /// Connect and request the writer capability, waiting for the grant.
    pub async fn connect(url: &str) -> Result<Self> {
        let (ws, _) = connect_async(url).await?;
        let mut client = Self { ws };

        client.send(&ClientMessage::PromoteToAdmin).await?;
        loop {
            match client.next_message().await? {
                Some(ServerMessage::AdminGranted) => return Ok(client),
                // State pushes and the spectator gauge arrive on connect;
                // skip past them.
                Some(_) => continue,
                None => return Err(anyhow!("connection closed before admin grant")),
            }
        }
    }

    /// Send a whole-state replacement candidate.
    pub async fn update_state(&mut self, update: ShowStateUpdate) -> Result<()> {
        self.send(&ClientMessage::UpdateState { state: update }).await
    }

    /// Trigger the active routine, optionally overriding the configured
    /// delay (milliseconds).
    pub async fn trigger(&mut self, delay: Option<u64>) -> Result<()> {
        self.send(&ClientMessage::TriggerRoutine { delay }).await
    }

    /// Abort any in-progress session on every client.
    pub async fn reset(&mut self) -> Result<()> {
        self.send(&ClientMessage::ResetRoutine).await
    }

    /// Next protocol message, or `None` once the connection closes.
    pub async fn next_message(&mut self) -> Result<Option<ServerMessage>> {
        while let Some(frame) = self.ws.next().await {
            match frame? {
                Message::Text(text) => return Ok(Some(serde_json::from_str(&text)?)),
                Message::Close(_) => return Ok(None),
                _ => continue,
            }
        }
        Ok(None)
    }

    async fn send(&mut self, message: &ClientMessage) -> Result<()> {
        let text = serde_json::to_string(message)?;
        self.ws.send(Message::Text(text)).await?;
        Ok(())
    }
}
