use std::sync::Arc;
use tracing::{info, warn};

use crate::store::SessionStore;
use crate::websocket::connection::{ConnectionId, ConnectionManager};
use relay_core::{normalize_code, RoundAdvance};
use relay_types::{ClientEvent, GameError, ServerEvent};

#[derive(Clone)]
pub struct MessageHandler {
    connection_id: ConnectionId,
    connection_manager: Arc<ConnectionManager>,
    store: Arc<SessionStore>,
}

impl MessageHandler {
    pub fn new(
        connection_id: ConnectionId,
        connection_manager: Arc<ConnectionManager>,
        store: Arc<SessionStore>,
    ) -> Self {
        Self {
            connection_id,
            connection_manager,
            store,
        }
    }

    pub async fn handle_event(&self, event: ClientEvent) -> Result<(), String> {
        // Update connection activity
        self.connection_manager
            .update_activity(self.connection_id)
            .await;

        match event {
            ClientEvent::JoinGame { code, nickname } => self.handle_join_game(code, nickname).await,
            ClientEvent::LeaveGame => self.handle_leave_game().await,
            ClientEvent::StartGame => self.handle_start_game().await,
            ClientEvent::RevealStep {
                chain_index,
                step_index,
            } => {
                self.relay_from_host(ServerEvent::RevealStep {
                    chain_index,
                    step_index,
                })
                .await
            }
            ClientEvent::RevealReset => self.relay_from_host(ServerEvent::RevealReset).await,
            ClientEvent::Heartbeat => Ok(()),
        }
    }

    pub async fn handle_disconnect(&self) {
        // An implicit disconnect is not a leave: the player stays in the
        // session and can reattach after a refresh. Only the socket goes.
        info!("Connection {} detached", self.connection_id);
    }

    /// Attach this socket to the room for its game. The caller must already
    /// be a member of the session (joined over HTTP).
    async fn handle_join_game(&self, code: String, nickname: String) -> Result<(), String> {
        let code = normalize_code(&code);
        let session = match self.store.get(&code).await {
            Ok(session) => session,
            Err(err) => return self.send_game_error(&err).await,
        };

        if session.player_index(&nickname).is_none() {
            return self
                .send_game_error(&GameError::PlayerNotFound { nickname })
                .await;
        }

        self.connection_manager
            .register_in_room(self.connection_id, code.clone(), nickname.clone())
            .await;
        info!(code = %code, nickname = %nickname, "socket attached to room");
        Ok(())
    }

    /// Detach the socket from its room. The authoritative leave happens over
    /// HTTP; this only stops the event fan-out.
    async fn handle_leave_game(&self) -> Result<(), String> {
        self.connection_manager
            .unregister_from_room(self.connection_id)
            .await;
        Ok(())
    }

    async fn handle_start_game(&self) -> Result<(), String> {
        let (code, nickname) = match self.registered_identity().await {
            Some(identity) => identity,
            None => return self.send_error("Attach to a game room first").await,
        };

        match self.store.start(&code, &nickname).await {
            Ok(_) => {
                self.connection_manager
                    .send_to_room(&code, ServerEvent::GameStarted)
                    .await;
                Ok(())
            }
            Err(err) => self.send_game_error(&err).await,
        }
    }

    /// Reveal controls only relay when the sending socket is registered as
    /// the session host; everyone else gets an error event back.
    async fn relay_from_host(&self, event: ServerEvent) -> Result<(), String> {
        let (code, nickname) = match self.registered_identity().await {
            Some(identity) => identity,
            None => return self.send_error("Attach to a game room first").await,
        };

        let session = match self.store.get(&code).await {
            Ok(session) => session,
            Err(err) => return self.send_game_error(&err).await,
        };
        if session.host_nickname != nickname {
            return self.send_game_error(&GameError::NotHost).await;
        }

        self.connection_manager
            .send_to_room_except(&code, self.connection_id, event)
            .await;
        Ok(())
    }

    /// Room broadcasts for a leave processed over HTTP; shared with the REST
    /// handler so both paths emit the same hints.
    pub async fn broadcast_leave(
        connection_manager: &ConnectionManager,
        code: &str,
        nickname: &str,
        advance: RoundAdvance,
    ) {
        connection_manager
            .send_to_room(
                code,
                ServerEvent::PlayerLeft {
                    nickname: nickname.to_string(),
                },
            )
            .await;
        match advance {
            RoundAdvance::NextRound(round) => {
                connection_manager
                    .send_to_room(code, ServerEvent::NextRound { round })
                    .await;
            }
            RoundAdvance::Finished => {
                connection_manager
                    .send_to_room(code, ServerEvent::GameEnded)
                    .await;
            }
            RoundAdvance::None => {}
        }
    }

    async fn registered_identity(&self) -> Option<(String, String)> {
        let connection = self
            .connection_manager
            .get_connection(self.connection_id)
            .await?;
        Some((connection.room?, connection.nickname?))
    }

    async fn send_game_error(&self, err: &GameError) -> Result<(), String> {
        warn!(connection = %self.connection_id, "channel request failed: {err}");
        self.send_error(&err.to_string()).await
    }

    async fn send_error(&self, message: &str) -> Result<(), String> {
        self.connection_manager
            .send_to_connection(
                self.connection_id,
                ServerEvent::Error {
                    message: message.to_string(),
                },
            )
            .await
    }
}
