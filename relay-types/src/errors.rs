use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

/// Every way a game-logic request can fail. Serialized as the HTTP error body
/// and inside channel `error` events so both transports speak the same shape.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum GameError {
    #[error("game {code} not found")]
    NotFound { code: String },
    #[error("player {nickname} is not in this game")]
    PlayerNotFound { nickname: String },
    #[error("game {code} has already started")]
    AlreadyStarted { code: String },
    #[error("nickname {nickname} is already taken in this game")]
    DuplicateNickname { nickname: String },
    #[error("need at least {min} players to start, have {count}")]
    NotEnoughPlayers { count: u32, min: u32 },
    #[error("chain {chain_id} already has an entry for round {round}")]
    DuplicateSubmission { chain_id: u32, round: u32 },
    #[error("invalid entry: {reason}")]
    InvalidEntry { reason: String },
    #[error("action not valid while game is {status}")]
    InvalidState { status: String },
    #[error("only the host may do that")]
    NotHost,
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl GameError {
    pub fn invalid_entry(reason: impl Into<String>) -> Self {
        GameError::InvalidEntry {
            reason: reason.into(),
        }
    }

    pub fn invalid_state(status: crate::GameStatus) -> Self {
        GameError::InvalidState {
            status: status.as_str().to_string(),
        }
    }

    pub fn storage(err: impl std::fmt::Display) -> Self {
        GameError::Storage {
            message: err.to_string(),
        }
    }
}
