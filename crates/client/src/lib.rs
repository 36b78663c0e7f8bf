//! Headless client for the Encore show protocol.
//!
//! A spectator connects, performs one clock-sync round trip, mirrors the
//! broadcast show state, and on a session start runs a frame loop that maps
//! the shared timeline onto a [`Renderer`]. The production spectators are
//! browsers running the same algorithm; this crate exists for tooling,
//! load-testing a venue network, and driving the protocol from tests.

pub use admin::AdminClient;
pub use engine::{ClientEngine, FrameOutput, LogRenderer, Renderer};

use std::time::Duration;

use anyhow::Result;
use encore_core::unix_now_ms;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

mod admin;
mod engine;

/// Display-rate tick, roughly one screen refresh.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// A read-only spectator connection driving a [`Renderer`].
pub struct SpectatorClient<R: Renderer> {
    url: String,
    engine: ClientEngine<R>,
}

impl<R: Renderer> SpectatorClient<R> {
    pub fn new(url: impl Into<String>, renderer: R) -> Self {
        Self {
            url: url.into(),
            engine: ClientEngine::new(renderer),
        }
    }

    /// Connect and run until the server closes the connection.
    pub async fn run(mut self) -> Result<()> {
        let (ws, _) = connect_async(self.url.as_str()).await?;
        let (mut tx, mut rx) = ws.split();

        let sync = self.engine.begin_sync(unix_now_ms());
        tx.send(Message::Text(serde_json::to_string(&sync)?)).await?;

        let mut frames = tokio::time::interval(FRAME_INTERVAL);
        loop {
            tokio::select! {
                _ = frames.tick() => {
                    self.engine.frame(unix_now_ms());
                }
                incoming = rx.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str(&text) {
                                Ok(message) => {
                                    self.engine.handle_server_message(message, unix_now_ms());
                                }
                                Err(err) => log::debug!("ignoring unrecognized message: {err}"),
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            log::warn!("connection error: {err}");
                            break;
                        }
                    }
                }
            }
        }

        log::info!("disconnected");
        Ok(())
    }
}
