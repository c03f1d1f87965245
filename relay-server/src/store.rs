use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::hooks::CompletionSink;
use relay_core::{normalize_code, RoundAdvance, SubmissionOutcome};
use relay_persistence::repositories::SessionRepository;
use relay_types::{
    Chain, EntrySubmission, GameError, GameSession, GameStatus, SubmissionResult, TaskAssignment,
};

const MAX_CODE_ATTEMPTS: usize = 16;

struct StoredSession {
    session: GameSession,
    last_activity: Instant,
}

impl StoredSession {
    fn new(session: GameSession) -> Self {
        Self {
            session,
            last_activity: Instant::now(),
        }
    }
}

/// Authoritative store of live sessions, looked up by code.
///
/// Each code maps to its own `Arc<Mutex<_>>` slot, so all mutations of one
/// game are serialized (the submit check-then-append is atomic) while
/// distinct games proceed in parallel. Every mutation writes through to the
/// repository before the lock is released; a lookup miss falls back to
/// storage so sessions survive a server restart.
pub struct SessionStore {
    sessions: DashMap<String, Arc<Mutex<StoredSession>>>,
    repository: SessionRepository,
    completion: Arc<dyn CompletionSink>,
}

impl SessionStore {
    pub fn new(repository: SessionRepository, completion: Arc<dyn CompletionSink>) -> Self {
        Self {
            sessions: DashMap::new(),
            repository,
            completion,
        }
    }

    pub async fn create(
        &self,
        host_nickname: &str,
        user_id: Option<Uuid>,
    ) -> Result<GameSession, GameError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = relay_core::generate_code();
            if self
                .repository
                .exists(&code)
                .await
                .map_err(GameError::storage)?
            {
                continue;
            }

            let session = relay_core::new_session(code.clone(), host_nickname, user_id)?;

            // Reserve the code in memory first; the entry API makes two
            // racing creates on the same code impossible.
            let slot = match self.sessions.entry(code) {
                dashmap::mapref::entry::Entry::Occupied(_) => continue,
                dashmap::mapref::entry::Entry::Vacant(vacant) => vacant
                    .insert(Arc::new(Mutex::new(StoredSession::new(session.clone()))))
                    .clone(),
            };

            let stored = slot.lock().await;
            if let Err(err) = self.repository.save(&stored.session).await {
                drop(stored);
                self.sessions.remove(&session.code);
                return Err(GameError::storage(err));
            }

            info!(code = %session.code, host = %session.host_nickname, "created game session");
            return Ok(session);
        }
        Err(GameError::storage("could not allocate a unique game code"))
    }

    pub async fn get(&self, code: &str) -> Result<GameSession, GameError> {
        let slot = self.slot(code).await?;
        let stored = slot.lock().await;
        Ok(stored.session.clone())
    }

    pub async fn join(
        &self,
        code: &str,
        nickname: &str,
        user_id: Option<Uuid>,
    ) -> Result<GameSession, GameError> {
        let (_, session) = self
            .with_session(code, |session| relay_core::join(session, nickname, user_id))
            .await?;
        Ok(session)
    }

    pub async fn leave(
        &self,
        code: &str,
        nickname: &str,
    ) -> Result<(RoundAdvance, GameSession), GameError> {
        let (advance, session) = self
            .with_session(code, |session| relay_core::leave(session, nickname))
            .await?;
        if advance == RoundAdvance::Finished {
            self.completion.game_finished(&session).await;
        }
        Ok((advance, session))
    }

    /// Host-only: transition the lobby into play.
    pub async fn start(&self, code: &str, nickname: &str) -> Result<GameSession, GameError> {
        let (_, session) = self
            .with_session(code, |session| {
                require_host(session, nickname)?;
                relay_core::start(session)
            })
            .await?;
        Ok(session)
    }

    /// Host-only: force-finish an in-progress game.
    pub async fn end(&self, code: &str, nickname: &str) -> Result<GameSession, GameError> {
        let (_, session) = self
            .with_session(code, |session| {
                require_host(session, nickname)?;
                relay_core::finish(session)
            })
            .await?;
        self.completion.game_finished(&session).await;
        Ok(session)
    }

    pub async fn task(&self, code: &str, nickname: &str) -> Result<TaskAssignment, GameError> {
        let slot = self.slot(code).await?;
        let stored = slot.lock().await;
        relay_core::player_task(&stored.session, nickname)
    }

    pub async fn submit(
        &self,
        code: &str,
        submission: &EntrySubmission,
    ) -> Result<(SubmissionResult, RoundAdvance), GameError> {
        let (outcome, session) = self
            .with_session(code, |session| relay_core::submit(session, submission))
            .await?;

        let SubmissionOutcome {
            all_submitted,
            submitted_count,
            total_players,
            advance,
        } = outcome;

        if advance == RoundAdvance::Finished {
            self.completion.game_finished(&session).await;
        }

        Ok((
            SubmissionResult {
                all_submitted,
                submitted_count,
                total_players,
                game_session: session,
            },
            advance,
        ))
    }

    pub async fn results(&self, code: &str) -> Result<Vec<Chain>, GameError> {
        let slot = self.slot(code).await?;
        let stored = slot.lock().await;
        if stored.session.status != GameStatus::Finished {
            return Err(GameError::invalid_state(stored.session.status));
        }
        Ok(stored.session.chains.clone())
    }

    /// Drop finished sessions nobody has touched for `retention`, in memory
    /// and in storage.
    pub async fn cleanup_stale(&self, retention: Duration) {
        let slots: Vec<(String, Arc<Mutex<StoredSession>>)> = self
            .sessions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        for (code, slot) in slots {
            let stale = {
                let stored = slot.lock().await;
                stored.session.status == GameStatus::Finished
                    && stored.last_activity.elapsed() > retention
            };
            if stale {
                self.sessions.remove(&code);
                info!(code = %code, "dropped stale finished session");
            }
        }

        let cutoff = Utc::now()
            - chrono::Duration::from_std(retention).unwrap_or_else(|_| chrono::Duration::hours(2));
        if let Err(err) = self.repository.delete_stale_finished(cutoff).await {
            warn!("failed to sweep stale sessions from storage: {err}");
        }
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Run a mutation under the code's lock and write the result through to
    /// storage before releasing it, so persisted snapshots never interleave
    /// out of order.
    async fn with_session<T>(
        &self,
        code: &str,
        mutate: impl FnOnce(&mut GameSession) -> Result<T, GameError>,
    ) -> Result<(T, GameSession), GameError> {
        let slot = self.slot(code).await?;
        let mut stored = slot.lock().await;

        let value = mutate(&mut stored.session)?;
        stored.last_activity = Instant::now();
        self.repository
            .save(&stored.session)
            .await
            .map_err(GameError::storage)?;

        Ok((value, stored.session.clone()))
    }

    async fn slot(&self, code: &str) -> Result<Arc<Mutex<StoredSession>>, GameError> {
        let code = normalize_code(code);
        if let Some(slot) = self.sessions.get(&code) {
            return Ok(slot.clone());
        }

        // Miss: rehydrate from storage (e.g. after a restart).
        let session = self
            .repository
            .find_by_code(&code)
            .await
            .map_err(GameError::storage)?
            .ok_or(GameError::NotFound { code: code.clone() })?;

        let slot = self
            .sessions
            .entry(code)
            .or_insert_with(|| Arc::new(Mutex::new(StoredSession::new(session))))
            .clone();
        Ok(slot)
    }
}

fn require_host(session: &GameSession, nickname: &str) -> Result<(), GameError> {
    if session.host_nickname != nickname {
        return Err(GameError::NotHost);
    }
    Ok(())
}
