use relay_types::{Entry, EntrySubmission, GameError, GameSession, GameStatus};
use tracing::info;

/// What recording an entry (or dropping an obligation) did to the round
/// counter. The caller turns this into the matching room broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundAdvance {
    None,
    NextRound(u32),
    Finished,
}

#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub all_submitted: bool,
    pub submitted_count: u32,
    pub total_players: u32,
    pub advance: RoundAdvance,
}

/// Validate and record one entry for the current round, then decide whether
/// the round is complete. The caller must hold the session's lock for the
/// whole call: the duplicate check and the append have to be atomic so two
/// players racing on the same chain+round cannot both succeed.
pub fn submit(
    session: &mut GameSession,
    submission: &EntrySubmission,
) -> Result<SubmissionOutcome, GameError> {
    if session.status != GameStatus::InProgress {
        return Err(GameError::invalid_state(session.status));
    }
    if session.player_index(&submission.player_nickname).is_none() {
        return Err(GameError::PlayerNotFound {
            nickname: submission.player_nickname.clone(),
        });
    }
    if submission.data.trim().is_empty() {
        return Err(GameError::invalid_entry("empty payload"));
    }

    let round = session.current_round;
    let total_players = session.players.len() as u32;
    let chain = session
        .chain_mut(submission.chain_id)
        .ok_or_else(|| GameError::invalid_entry(format!("unknown chain {}", submission.chain_id)))?;

    if chain.entry_for_round(round).is_some() {
        return Err(GameError::DuplicateSubmission {
            chain_id: submission.chain_id,
            round,
        });
    }

    // Alternation guard: stale or replayed client state shows up as the
    // wrong entry type for the chain's tail.
    let expected = chain
        .entries
        .last()
        .map(|entry| entry.entry_type.next())
        .unwrap_or(relay_types::EntryType::Prompt);
    if submission.entry_type != expected {
        return Err(GameError::invalid_entry(format!(
            "chain {} expects a {} in round {}",
            submission.chain_id,
            expected.as_str(),
            round
        )));
    }
    if let Some(last) = chain.entries.last() {
        if last.player_nickname == submission.player_nickname {
            return Err(GameError::invalid_entry(
                "cannot continue your own previous entry",
            ));
        }
    }

    chain.entries.push(Entry {
        round,
        player_nickname: submission.player_nickname.clone(),
        entry_type: submission.entry_type,
        data: submission.data.clone(),
    });
    if round == 1 {
        chain.original_prompt = Some(submission.data.clone());
    }

    let submitted_count = session.submitted_count(round) as u32;
    let all_submitted = submitted_count >= total_players;
    let advance = if all_submitted {
        maybe_advance(session)
    } else {
        RoundAdvance::None
    };

    Ok(SubmissionOutcome {
        all_submitted,
        submitted_count,
        total_players,
        advance,
    })
}

/// Advance or finish once every current player has an entry this round.
/// Also called after a mid-round leave, which shrinks the denominator.
pub(crate) fn maybe_advance(session: &mut GameSession) -> RoundAdvance {
    if session.status != GameStatus::InProgress || session.players.is_empty() {
        return RoundAdvance::None;
    }
    if session.submitted_count(session.current_round) < session.players.len() {
        return RoundAdvance::None;
    }

    if session.current_round >= session.total_rounds {
        session.status = GameStatus::Finished;
        info!(code = %session.code, round = session.current_round, "all chains complete, game finished");
        RoundAdvance::Finished
    } else {
        session.current_round += 1;
        info!(code = %session.code, round = session.current_round, "round complete, advancing");
        RoundAdvance::NextRound(session.current_round)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::player_task;
    use crate::session::{join, leave, new_session, start};
    use relay_types::EntryType;

    fn started_session(players: &[&str]) -> GameSession {
        let mut session = new_session("ABC234".to_string(), players[0], None).unwrap();
        for nickname in &players[1..] {
            join(&mut session, nickname, None).unwrap();
        }
        start(&mut session).unwrap();
        session
    }

    fn submit_task(session: &mut GameSession, nickname: &str, data: &str) -> SubmissionOutcome {
        let task = player_task(session, nickname).unwrap();
        submit(
            session,
            &EntrySubmission {
                player_nickname: nickname.to_string(),
                chain_id: task.chain_id,
                entry_type: task.task_type,
                data: data.to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn first_submission_waits_for_the_rest() {
        let mut session = started_session(&["Ann", "Ben"]);
        let outcome = submit_task(&mut session, "Ann", "a flying cat");
        assert!(!outcome.all_submitted);
        assert_eq!(outcome.submitted_count, 1);
        assert_eq!(outcome.total_players, 2);
        assert_eq!(outcome.advance, RoundAdvance::None);
        assert_eq!(session.current_round, 1);
    }

    #[test]
    fn round_one_submissions_seed_the_original_prompt() {
        let mut session = started_session(&["Ann", "Ben"]);
        submit_task(&mut session, "Ann", "a flying cat");
        let chain = session
            .chains
            .iter()
            .find(|c| c.original_player == "Ann")
            .unwrap();
        assert_eq!(chain.original_prompt.as_deref(), Some("a flying cat"));
    }

    #[test]
    fn completing_a_round_advances_the_counter() {
        let mut session = started_session(&["Ann", "Ben"]);
        submit_task(&mut session, "Ann", "a flying cat");
        let outcome = submit_task(&mut session, "Ben", "a robot");
        assert!(outcome.all_submitted);
        assert_eq!(outcome.advance, RoundAdvance::NextRound(2));
        assert_eq!(session.current_round, 2);
    }

    #[test]
    fn duplicate_chain_round_submission_is_rejected() {
        let mut session = started_session(&["Ann", "Ben"]);
        let task = player_task(&session, "Ann").unwrap();
        submit_task(&mut session, "Ann", "a flying cat");
        let err = submit(
            &mut session,
            &EntrySubmission {
                player_nickname: "Ben".to_string(),
                chain_id: task.chain_id,
                entry_type: EntryType::Prompt,
                data: "a robot".to_string(),
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            GameError::DuplicateSubmission {
                chain_id: task.chain_id,
                round: 1
            }
        );
    }

    #[test]
    fn alternation_mismatch_is_rejected() {
        let mut session = started_session(&["Ann", "Ben"]);
        let task = player_task(&session, "Ann").unwrap();
        let err = submit(
            &mut session,
            &EntrySubmission {
                player_nickname: "Ann".to_string(),
                chain_id: task.chain_id,
                entry_type: EntryType::Drawing,
                data: "img:deadbeef".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, GameError::InvalidEntry { .. }));
    }

    #[test]
    fn empty_payloads_are_rejected() {
        let mut session = started_session(&["Ann", "Ben"]);
        let task = player_task(&session, "Ann").unwrap();
        let err = submit(
            &mut session,
            &EntrySubmission {
                player_nickname: "Ann".to_string(),
                chain_id: task.chain_id,
                entry_type: EntryType::Prompt,
                data: "   ".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, GameError::InvalidEntry { .. }));
    }

    #[test]
    fn final_round_completion_finishes_the_game() {
        let mut session = started_session(&["Ann", "Ben"]);
        submit_task(&mut session, "Ann", "a flying cat");
        submit_task(&mut session, "Ben", "a robot");
        submit_task(&mut session, "Ann", "img:robot-sketch");
        let outcome = submit_task(&mut session, "Ben", "img:cat-sketch");
        assert!(outcome.all_submitted);
        assert_eq!(outcome.advance, RoundAdvance::Finished);
        assert_eq!(session.status, GameStatus::Finished);
    }

    #[test]
    fn mid_round_leave_can_complete_the_round() {
        let mut session = started_session(&["Ann", "Ben", "Cat"]);
        submit_task(&mut session, "Ann", "a flying cat");
        submit_task(&mut session, "Ben", "a robot");
        // Cat never submits; their departure drops the obligation.
        let advance = leave(&mut session, "Cat").unwrap();
        assert_eq!(advance, RoundAdvance::NextRound(2));
        assert_eq!(session.current_round, 2);
        assert_eq!(session.players.len(), 2);
        assert_eq!(session.chains.len(), 3);
    }

    #[test]
    fn submissions_outside_a_running_game_fail() {
        let mut lobby = new_session("XYZ789".to_string(), "Ann", None).unwrap();
        let err = submit(
            &mut lobby,
            &EntrySubmission {
                player_nickname: "Ann".to_string(),
                chain_id: 0,
                entry_type: EntryType::Prompt,
                data: "x".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, GameError::InvalidState { .. }));

        let mut finished = started_session(&["Ann", "Ben"]);
        finished.status = GameStatus::Finished;
        let err = submit(
            &mut finished,
            &EntrySubmission {
                player_nickname: "Ann".to_string(),
                chain_id: 0,
                entry_type: EntryType::Prompt,
                data: "x".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, GameError::InvalidState { .. }));
    }
}
