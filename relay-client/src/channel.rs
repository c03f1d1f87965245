use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{error, warn};

use crate::api::ClientError;
use relay_core::normalize_code;
use relay_types::{ClientEvent, ServerEvent};

/// The client end of the per-game event channel. Events received here are
/// wake-up hints only; the controller re-fetches the session over HTTP on
/// every one of them. If the socket dies the game keeps working off the
/// polling backstop, so the channel reconnect policy is simply "dial again
/// whenever the UI wants to".
pub struct Channel {
    outgoing: mpsc::UnboundedSender<ClientEvent>,
    incoming: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Channel {
    /// Dial the server and attach this socket to the game's room.
    pub async fn connect(ws_url: &str, code: &str, nickname: &str) -> Result<Self, ClientError> {
        let (stream, _) = connect_async(ws_url).await?;
        let (mut ws_sender, mut ws_receiver) = stream.split();

        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel::<ServerEvent>();

        // Register into the room before anything else goes out.
        let _ = outgoing_tx.send(ClientEvent::JoinGame {
            code: normalize_code(code),
            nickname: nickname.to_string(),
        });

        tokio::spawn(async move {
            while let Some(event) = outgoing_rx.recv().await {
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize event: {:?}", e);
                        continue;
                    }
                };
                if ws_sender.send(Message::text(json)).await.is_err() {
                    break;
                }
            }
        });

        tokio::spawn(async move {
            while let Some(result) = ws_receiver.next().await {
                match result {
                    Ok(msg) if msg.is_text() => {
                        let text = msg.to_text().unwrap_or("");
                        match serde_json::from_str::<ServerEvent>(text) {
                            Ok(event) => {
                                if incoming_tx.send(event).is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("Ignoring unparseable channel event: {}", e),
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Channel closed: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            outgoing: outgoing_tx,
            incoming: incoming_rx,
        })
    }

    /// Queue an event for the server. Returns false once the socket is gone;
    /// the caller falls back to polling.
    pub fn send(&self, event: ClientEvent) -> bool {
        self.outgoing.send(event).is_ok()
    }

    /// Next server hint, or `None` when the channel has closed.
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        self.incoming.recv().await
    }
}
