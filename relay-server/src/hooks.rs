use async_trait::async_trait;
use relay_types::{EntryType, GameSession};
use tracing::info;

/// Outbound seam to the rest of ArtHive. When a game finishes, its drawings
/// become eligible for one-click repost into the content feed and players
/// earn participation credit in the leveling system. Both live in other
/// services; the game only announces the completion.
#[async_trait]
pub trait CompletionSink: Send + Sync {
    async fn game_finished(&self, session: &GameSession);
}

/// Default sink used when the server runs standalone: records the completion
/// so an operator can see what the feed and leveling services would receive.
pub struct LogCompletionSink;

#[async_trait]
impl CompletionSink for LogCompletionSink {
    async fn game_finished(&self, session: &GameSession) {
        let drawings = session
            .chains
            .iter()
            .flat_map(|chain| chain.entries.iter())
            .filter(|entry| entry.entry_type == EntryType::Drawing)
            .count();
        info!(
            code = %session.code,
            players = session.players.len(),
            drawings,
            "game finished; drawings eligible for feed repost"
        );
    }
}
