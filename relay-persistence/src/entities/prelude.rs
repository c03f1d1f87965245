pub use super::game_sessions::Entity as GameSessions;
