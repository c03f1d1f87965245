use relay_types::{Chain, GameError, GameSession, GameStatus, SessionPlayer};
use tracing::info;
use uuid::Uuid;

use crate::submission::{maybe_advance, RoundAdvance};

pub const MIN_PLAYERS: usize = 2;

/// Create a fresh session in the lobby state with the host seated.
pub fn new_session(
    code: String,
    host_nickname: &str,
    user_id: Option<Uuid>,
) -> Result<GameSession, GameError> {
    let nickname = valid_nickname(host_nickname)?;
    Ok(GameSession {
        code,
        host_nickname: nickname.clone(),
        players: vec![SessionPlayer::new(nickname, user_id)],
        status: GameStatus::Waiting,
        total_rounds: 0,
        current_round: 0,
        chains: Vec::new(),
        created_at: chrono::Utc::now().to_rfc3339(),
    })
}

/// Seat a new player. Only possible while the lobby is still waiting.
pub fn join(
    session: &mut GameSession,
    nickname: &str,
    user_id: Option<Uuid>,
) -> Result<(), GameError> {
    if session.status != GameStatus::Waiting {
        return Err(GameError::AlreadyStarted {
            code: session.code.clone(),
        });
    }
    let nickname = valid_nickname(nickname)?;
    if session.player_index(&nickname).is_some() {
        return Err(GameError::DuplicateNickname { nickname });
    }
    session.players.push(SessionPlayer::new(nickname, user_id));
    Ok(())
}

/// Remove a player. Mid-round, their outstanding submission obligation is
/// dropped, which can itself complete the round for everyone else.
pub fn leave(session: &mut GameSession, nickname: &str) -> Result<RoundAdvance, GameError> {
    let index = session
        .player_index(nickname)
        .ok_or_else(|| GameError::PlayerNotFound {
            nickname: nickname.to_string(),
        })?;
    session.players.remove(index);
    info!(code = %session.code, nickname, "player left");

    if session.status == GameStatus::InProgress {
        return Ok(maybe_advance(session));
    }
    Ok(RoundAdvance::None)
}

/// Transition the lobby into play: fix the round count at the player count
/// and seed one chain per player, each seeded by that player's own round-1
/// prompt. The rotation then walks every other player across the chain.
pub fn start(session: &mut GameSession) -> Result<(), GameError> {
    if session.status != GameStatus::Waiting {
        return Err(GameError::AlreadyStarted {
            code: session.code.clone(),
        });
    }
    if session.players.len() < MIN_PLAYERS {
        return Err(GameError::NotEnoughPlayers {
            count: session.players.len() as u32,
            min: MIN_PLAYERS as u32,
        });
    }

    session.total_rounds = session.players.len() as u32;
    session.current_round = 1;
    session.status = GameStatus::InProgress;
    session.chains = session
        .players
        .iter()
        .enumerate()
        .map(|(i, player)| Chain {
            chain_id: i as u32,
            original_player: player.nickname.clone(),
            original_prompt: None,
            entries: Vec::new(),
        })
        .collect();

    info!(
        code = %session.code,
        players = session.players.len(),
        rounds = session.total_rounds,
        "game started"
    );
    Ok(())
}

/// Force-finish an in-progress game.
pub fn finish(session: &mut GameSession) -> Result<(), GameError> {
    if session.status != GameStatus::InProgress {
        return Err(GameError::invalid_state(session.status));
    }
    session.status = GameStatus::Finished;
    info!(code = %session.code, "game ended by host");
    Ok(())
}

/// Whether `nickname` has already recorded an entry for the current round.
/// Drives the client's waiting-for-others view after a submit.
pub fn has_submitted_this_round(session: &GameSession, nickname: &str) -> bool {
    session.chains.iter().any(|chain| {
        chain
            .entry_for_round(session.current_round)
            .is_some_and(|entry| entry.player_nickname == nickname)
    })
}

fn valid_nickname(nickname: &str) -> Result<String, GameError> {
    let trimmed = nickname.trim();
    if trimmed.is_empty() {
        return Err(GameError::invalid_entry("nickname must not be empty"));
    }
    Ok(trimmed.to_string())
}
