use relay_core::{join, new_session, player_task, start, submit, SubmissionOutcome};
use relay_types::{EntrySubmission, GameSession};

/// Creates a started session with the given nicknames, host first.
pub fn create_started_session(players: &[&str]) -> GameSession {
    let mut session = new_session("TEST42".to_string(), players[0], None)
        .expect("host nickname should be valid");
    for nickname in &players[1..] {
        join(&mut session, nickname, None).expect("lobby join should succeed");
    }
    start(&mut session).expect("start should succeed");
    session
}

/// Fetches the player's task and submits a matching entry.
pub fn submit_for(session: &mut GameSession, nickname: &str, data: &str) -> SubmissionOutcome {
    let task = player_task(session, nickname).expect("player should have a task");
    submit(
        session,
        &EntrySubmission {
            player_nickname: nickname.to_string(),
            chain_id: task.chain_id,
            entry_type: task.task_type,
            data: data.to_string(),
        },
    )
    .expect("submission should be accepted")
}

/// Plays every remaining round to completion, each player submitting
/// whatever their task asks for.
pub fn play_to_completion(session: &mut GameSession) {
    while session.status == relay_types::GameStatus::InProgress {
        let nicknames: Vec<String> = session
            .players
            .iter()
            .map(|p| p.nickname.clone())
            .collect();
        for nickname in nicknames {
            let round = session.current_round;
            submit_for(session, &nickname, &format!("{nickname}-r{round}"));
        }
    }
}
