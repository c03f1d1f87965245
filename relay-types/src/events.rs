use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Events a client sends over the channel. `join-game` registers the socket
/// into the room for its code; everything else assumes the socket is already
/// registered.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "event", rename_all = "kebab-case")]
#[ts(export)]
pub enum ClientEvent {
    JoinGame { code: String, nickname: String },
    LeaveGame,
    StartGame,
    RevealStep { chain_index: u32, step_index: u32 },
    RevealReset,
    Heartbeat,
}

/// Events the server pushes to a room. Payloads are hints only: receivers
/// re-fetch the session over HTTP rather than trusting these fields, so a
/// missed or reordered event cannot desynchronize a client.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "event", rename_all = "kebab-case")]
#[ts(export)]
pub enum ServerEvent {
    PlayerJoined {
        nickname: String,
    },
    PlayerLeft {
        nickname: String,
    },
    GameStarted,
    PlayerSubmitted {
        nickname: String,
        submitted_count: u32,
        total_players: u32,
    },
    NextRound {
        round: u32,
    },
    GameEnded,
    RevealStep {
        chain_index: u32,
        step_index: u32,
    },
    RevealReset,
    Error {
        message: String,
    },
}
