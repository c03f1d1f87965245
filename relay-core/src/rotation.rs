use relay_types::{EntryType, GameError, GameSession, GameStatus, TaskAssignment};

/// Which chain the player at `player_index` owns in `round`.
///
/// The relay rotation: chain `i` is authored in round `r` by player
/// `(i + r - 1) mod P`, so inverting, player `p` owns chain
/// `(p - (r - 1)) mod C`. Chains never shrink, so `C >= P` holds for the
/// whole game and the assignment stays injective even after players leave:
/// every remaining player owns a distinct chain each round, every player
/// touches every chain once over a full game, and nobody continues the entry
/// they just wrote.
pub fn assigned_chain(player_index: usize, round: u32, chain_count: usize) -> usize {
    debug_assert!(chain_count > 0);
    let offset = i64::from(round) - 1;
    (player_index as i64 - offset).rem_euclid(chain_count as i64) as usize
}

/// Inverse of [`assigned_chain`] for a full table: the player index that
/// authors `chain_index` in `round`.
pub fn chain_author(chain_index: usize, round: u32, player_count: usize) -> usize {
    debug_assert!(player_count > 0);
    (chain_index as i64 + i64::from(round) - 1).rem_euclid(player_count as i64) as usize
}

/// Derive what `nickname` must produce for the current round: the owned
/// chain, the task type continuing that chain's alternation, and the prior
/// entry they react to (absent in round 1).
pub fn player_task(session: &GameSession, nickname: &str) -> Result<TaskAssignment, GameError> {
    if session.status != GameStatus::InProgress {
        return Err(GameError::invalid_state(session.status));
    }
    let player_index =
        session
            .player_index(nickname)
            .ok_or_else(|| GameError::PlayerNotFound {
                nickname: nickname.to_string(),
            })?;

    let chain_index = assigned_chain(player_index, session.current_round, session.chains.len());
    let chain = &session.chains[chain_index];
    let previous_entry = chain.entries.last().cloned();
    let task_type = previous_entry
        .as_ref()
        .map(|entry| entry.entry_type.next())
        .unwrap_or(EntryType::Prompt);

    Ok(TaskAssignment {
        chain_id: chain.chain_id,
        task_type,
        previous_entry,
    })
}
