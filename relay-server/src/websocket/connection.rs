use relay_types::ServerEvent;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One live socket. A connection is anonymous until its `join-game` event
/// registers it into a room under a nickname.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub nickname: Option<String>,
    pub room: Option<String>,
    pub connected_at: Instant,
    pub last_activity: Instant,
    pub sender: mpsc::UnboundedSender<ServerEvent>,
}

impl Connection {
    pub fn new(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let now = Instant::now();

        let connection = Self {
            id,
            nickname: None,
            room: None,
            connected_at: now,
            last_activity: now,
            sender,
        };

        (connection, receiver)
    }

    pub fn update_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn register(&mut self, room: String, nickname: String) {
        self.room = Some(room);
        self.nickname = Some(nickname);
    }

    pub fn unregister(&mut self) {
        self.room = None;
        self.nickname = None;
    }

    pub fn send_event(&self, event: ServerEvent) -> Result<(), String> {
        self.sender
            .send(event)
            .map_err(|_| "Connection closed".to_string())
    }

    pub fn is_inactive(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }
}

/// Registry of live sockets and their room membership. Rooms carry no
/// authoritative state; they only fan hint events out to whoever is attached
/// under the same game code.
pub struct ConnectionManager {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create_connection(
        &self,
        id: ConnectionId,
    ) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (conn, receiver) = Connection::new(id);

        {
            let mut connections = self.connections.write().await;
            connections.insert(id, conn);
        }

        receiver
    }

    pub async fn remove_connection(&self, id: ConnectionId) {
        let mut connections = self.connections.write().await;
        connections.remove(&id);
    }

    pub async fn get_connection(&self, id: ConnectionId) -> Option<Connection> {
        let connections = self.connections.read().await;
        connections.get(&id).cloned()
    }

    pub async fn update_activity(&self, id: ConnectionId) {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&id) {
            connection.update_activity();
        }
    }

    pub async fn register_in_room(&self, id: ConnectionId, room: String, nickname: String) {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&id) {
            connection.register(room, nickname);
        }
    }

    pub async fn unregister_from_room(&self, id: ConnectionId) {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&id) {
            connection.unregister();
        }
    }

    pub async fn send_to_connection(
        &self,
        id: ConnectionId,
        event: ServerEvent,
    ) -> Result<(), String> {
        let connections = self.connections.read().await;
        if let Some(connection) = connections.get(&id) {
            connection.send_event(event)
        } else {
            Err("Connection not found".to_string())
        }
    }

    pub async fn send_to_room(&self, room: &str, event: ServerEvent) {
        let connections = self.connections.read().await;
        for connection in connections.values() {
            if connection.room.as_deref() == Some(room) {
                let _ = connection.send_event(event.clone());
            }
        }
    }

    pub async fn send_to_room_except(
        &self,
        room: &str,
        except_connection: ConnectionId,
        event: ServerEvent,
    ) {
        let connections = self.connections.read().await;
        for connection in connections.values() {
            if connection.id != except_connection && connection.room.as_deref() == Some(room) {
                let _ = connection.send_event(event.clone());
            }
        }
    }

    /// Broadcast skipping every socket registered under `nickname` — used
    /// when the trigger arrived over HTTP and carries no connection id.
    pub async fn send_to_room_except_player(&self, room: &str, nickname: &str, event: ServerEvent) {
        let connections = self.connections.read().await;
        for connection in connections.values() {
            if connection.room.as_deref() == Some(room)
                && connection.nickname.as_deref() != Some(nickname)
            {
                let _ = connection.send_event(event.clone());
            }
        }
    }

    pub async fn connections_in_room(&self, room: &str) -> Vec<ConnectionId> {
        let connections = self.connections.read().await;
        connections
            .values()
            .filter(|conn| conn.room.as_deref() == Some(room))
            .map(|conn| conn.id)
            .collect()
    }

    pub async fn cleanup_inactive_connections(&self, timeout: Duration) {
        let inactive_connections: Vec<ConnectionId> = {
            let connections = self.connections.read().await;
            connections
                .values()
                .filter(|conn| conn.is_inactive(timeout))
                .map(|conn| conn.id)
                .collect()
        };

        for connection_id in inactive_connections {
            tracing::info!("Removing inactive connection: {}", connection_id);
            self.remove_connection(connection_id).await;
        }
    }

    // Test helper
    pub async fn connection_count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connection_creation_and_removal() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let _receiver = manager.create_connection(conn_id).await;
        assert_eq!(manager.connection_count().await, 1);

        manager.remove_connection(conn_id).await;
        assert_eq!(manager.connection_count().await, 0);
    }

    #[tokio::test]
    async fn room_broadcast_reaches_every_member() {
        let manager = ConnectionManager::new();
        let conn_id1 = ConnectionId::new();
        let conn_id2 = ConnectionId::new();

        let mut receiver1 = manager.create_connection(conn_id1).await;
        let mut receiver2 = manager.create_connection(conn_id2).await;

        manager
            .register_in_room(conn_id1, "ABC234".to_string(), "Ann".to_string())
            .await;
        manager
            .register_in_room(conn_id2, "ABC234".to_string(), "Ben".to_string())
            .await;

        manager.send_to_room("ABC234", ServerEvent::GameStarted).await;

        assert!(receiver1.try_recv().is_ok());
        assert!(receiver2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn broadcast_excluding_a_player_skips_their_sockets() {
        let manager = ConnectionManager::new();
        let conn_id1 = ConnectionId::new();
        let conn_id2 = ConnectionId::new();

        let mut receiver1 = manager.create_connection(conn_id1).await;
        let mut receiver2 = manager.create_connection(conn_id2).await;

        manager
            .register_in_room(conn_id1, "ABC234".to_string(), "Ann".to_string())
            .await;
        manager
            .register_in_room(conn_id2, "ABC234".to_string(), "Ben".to_string())
            .await;

        manager
            .send_to_room_except_player(
                "ABC234",
                "Ann",
                ServerEvent::PlayerSubmitted {
                    nickname: "Ann".to_string(),
                    submitted_count: 1,
                    total_players: 2,
                },
            )
            .await;

        assert!(receiver1.try_recv().is_err());
        assert!(receiver2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn rooms_are_isolated_by_code() {
        let manager = ConnectionManager::new();
        let conn_id1 = ConnectionId::new();
        let conn_id2 = ConnectionId::new();

        let mut receiver1 = manager.create_connection(conn_id1).await;
        let mut receiver2 = manager.create_connection(conn_id2).await;

        manager
            .register_in_room(conn_id1, "ABC234".to_string(), "Ann".to_string())
            .await;
        manager
            .register_in_room(conn_id2, "XYZ789".to_string(), "Ben".to_string())
            .await;

        manager.send_to_room("ABC234", ServerEvent::GameEnded).await;

        assert!(receiver1.try_recv().is_ok());
        assert!(receiver2.try_recv().is_err());
    }

    #[tokio::test]
    async fn sending_to_closed_connection_errors() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let receiver = manager.create_connection(conn_id).await;
        drop(receiver);

        let result = manager
            .send_to_connection(conn_id, ServerEvent::GameEnded)
            .await;
        assert_eq!(result.unwrap_err(), "Connection closed");
    }

    #[tokio::test]
    async fn inactive_connections_are_cleaned_up() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let _receiver = manager.create_connection(conn_id).await;

        manager
            .cleanup_inactive_connections(Duration::from_secs(60))
            .await;
        assert_eq!(manager.connection_count().await, 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        manager
            .cleanup_inactive_connections(Duration::from_millis(10))
            .await;
        assert_eq!(manager.connection_count().await, 0);
    }
}
