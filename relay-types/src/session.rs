use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::player::SessionPlayer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum GameStatus {
    Waiting,    // Lobby open, players may join or leave
    InProgress, // Rounds running
    Finished,   // Terminal
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Waiting => "waiting",
            GameStatus::InProgress => "in-progress",
            GameStatus::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum EntryType {
    Prompt,
    Drawing,
}

impl EntryType {
    /// The type the entry following one of this type must have.
    pub fn next(self) -> Self {
        match self {
            EntryType::Prompt => EntryType::Drawing,
            EntryType::Drawing => EntryType::Prompt,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Prompt => "prompt",
            EntryType::Drawing => "drawing",
        }
    }
}

/// A single player's contribution to a chain in one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Entry {
    pub round: u32,
    pub player_nickname: String,
    pub entry_type: EntryType,
    /// Free text for prompts, an encoded image payload for drawings.
    pub data: String,
}

/// One relay sequence of alternating prompt/drawing entries. The round-1
/// entry is the seed; `original_player`/`original_prompt` mirror it so the
/// reveal screen can label a chain without digging into `entries`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Chain {
    pub chain_id: u32,
    pub original_player: String,
    /// Filled in when the seeding player submits their round-1 prompt.
    pub original_prompt: Option<String>,
    pub entries: Vec<Entry>,
}

impl Chain {
    pub fn entry_for_round(&self, round: u32) -> Option<&Entry> {
        self.entries.iter().find(|e| e.round == round)
    }
}

/// Root aggregate for one game, looked up by its shareable code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GameSession {
    pub code: String,
    pub host_nickname: String,
    pub players: Vec<SessionPlayer>,
    pub status: GameStatus,
    /// Zero until started, then fixed at the player count at start time.
    pub total_rounds: u32,
    /// 1-indexed; zero while the lobby is still waiting.
    pub current_round: u32,
    pub chains: Vec<Chain>,
    pub created_at: String, // ISO 8601 string
}

impl GameSession {
    pub fn player_index(&self, nickname: &str) -> Option<usize> {
        self.players.iter().position(|p| p.nickname == nickname)
    }

    pub fn chain(&self, chain_id: u32) -> Option<&Chain> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }

    pub fn chain_mut(&mut self, chain_id: u32) -> Option<&mut Chain> {
        self.chains.iter_mut().find(|c| c.chain_id == chain_id)
    }

    /// Number of distinct chains holding an entry for `round`.
    pub fn submitted_count(&self, round: u32) -> usize {
        self.chains
            .iter()
            .filter(|c| c.entry_for_round(round).is_some())
            .count()
    }
}

/// What a player must produce next, plus the prior content they react to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaskAssignment {
    pub chain_id: u32,
    pub task_type: EntryType,
    /// Absent in round 1, where every task is a fresh prompt.
    pub previous_entry: Option<Entry>,
}

/// Body of a submit-entry call.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EntrySubmission {
    pub player_nickname: String,
    pub chain_id: u32,
    pub entry_type: EntryType,
    pub data: String,
}

/// Outcome of recording one entry, echoed back to the submitting client so it
/// can decide whether to wait or fetch its next task immediately.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SubmissionResult {
    pub all_submitted: bool,
    pub game_session: GameSession,
    pub submitted_count: u32,
    pub total_players: u32,
}
