use std::time::Duration;

use tracing::warn;
use uuid::Uuid;

use crate::api::{ApiClient, ClientError};
use crate::persist::{SavedSession, SessionFile};
use relay_core::RevealCursor;
use relay_types::{
    Chain, ClientEvent, EntrySubmission, GameSession, GameStatus, ServerEvent, SubmissionResult,
    TaskAssignment,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Which screen the UI renders. Always derived from the latest server
/// snapshot, never from remembered client state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Lobby,
    Task,
    Results,
}

/// Pure reducer from a server snapshot to a screen. Rejoin relies on this
/// being a function of the snapshot alone: a reloaded client lands on
/// exactly the screen its current status warrants.
pub fn derive_screen(session: &GameSession, nickname: &str) -> Screen {
    if session.player_index(nickname).is_none() {
        return Screen::Menu;
    }
    match session.status {
        GameStatus::Waiting => Screen::Lobby,
        GameStatus::InProgress => Screen::Task,
        GameStatus::Finished => Screen::Results,
    }
}

struct Attachment {
    code: String,
    nickname: String,
    snapshot: GameSession,
}

/// Client-side session state machine. Holds the last known server snapshot
/// and reconciles it against channel hints, the periodic poll, and the
/// responses of its own calls. All state-changing facts come from re-fetching
/// the session; event payloads are treated as wake-ups only.
pub struct SessionController {
    api: ApiClient,
    session_file: SessionFile,
    attachment: Option<Attachment>,
    reveal: RevealCursor,
    poll_interval: Duration,
}

impl SessionController {
    pub fn new(api: ApiClient, session_file: SessionFile) -> Self {
        Self {
            api,
            session_file,
            attachment: None,
            reveal: RevealCursor::reset(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// The lobby/task polling cadence; the backstop against missed events.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn screen(&self) -> Screen {
        match &self.attachment {
            Some(att) => derive_screen(&att.snapshot, &att.nickname),
            None => Screen::Menu,
        }
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.attachment.as_ref().map(|att| &att.snapshot)
    }

    pub fn is_host(&self) -> bool {
        self.attachment
            .as_ref()
            .is_some_and(|att| att.snapshot.host_nickname == att.nickname)
    }

    pub fn has_submitted_this_round(&self) -> bool {
        self.attachment
            .as_ref()
            .is_some_and(|att| relay_core::has_submitted_this_round(&att.snapshot, &att.nickname))
    }

    /// Reattach after a reload: if a persisted `{code, nickname}` exists and
    /// the server still lists us, re-derive the screen from the fresh
    /// snapshot. A stale hint (game gone, or we were removed) is cleared; a
    /// network failure keeps it for the next launch.
    pub async fn resume(&mut self) -> Result<Option<Screen>, ClientError> {
        let Some(saved) = self.session_file.load() else {
            return Ok(None);
        };

        match self.api.get_game(&saved.code).await {
            Ok(session) if session.player_index(&saved.nickname).is_some() => {
                let code = session.code.clone();
                self.attach(code, saved.nickname, session)?;
                Ok(Some(self.screen()))
            }
            Ok(_) => {
                self.session_file.clear()?;
                Ok(None)
            }
            Err(ClientError::Api(_)) => {
                self.session_file.clear()?;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn create_game(
        &mut self,
        nickname: &str,
        user_id: Option<Uuid>,
    ) -> Result<Screen, ClientError> {
        let session = self.api.create_game(nickname, user_id).await?;
        let code = session.code.clone();
        let nickname = session.host_nickname.clone();
        self.attach(code, nickname, session)?;
        Ok(self.screen())
    }

    pub async fn join_game(
        &mut self,
        code: &str,
        nickname: &str,
        user_id: Option<Uuid>,
    ) -> Result<Screen, ClientError> {
        let nickname = nickname.trim().to_string();
        let session = self.api.join_game(code, &nickname, user_id).await?;
        let code = session.code.clone();
        self.attach(code, nickname, session)?;
        Ok(self.screen())
    }

    /// Host action: begin the game.
    pub async fn start(&mut self) -> Result<Screen, ClientError> {
        let (code, nickname) = self.identity()?;
        let session = self.api.start_game(&code, &nickname).await?;
        self.replace_snapshot(session);
        Ok(self.screen())
    }

    /// Host action: force-finish the game.
    pub async fn end(&mut self) -> Result<Screen, ClientError> {
        let (code, nickname) = self.identity()?;
        let session = self.api.end_game(&code, &nickname).await?;
        self.replace_snapshot(session);
        Ok(self.screen())
    }

    pub async fn current_task(&self) -> Result<TaskAssignment, ClientError> {
        let (code, nickname) = self.identity()?;
        self.api.get_task(&code, &nickname).await
    }

    /// Record this round's entry. The response snapshot replaces ours, so
    /// an `all_submitted` result lands the UI straight in the next round
    /// (or on the results screen).
    pub async fn submit(
        &mut self,
        task: &TaskAssignment,
        data: String,
    ) -> Result<SubmissionResult, ClientError> {
        let (code, nickname) = self.identity()?;
        let submission = EntrySubmission {
            player_nickname: nickname,
            chain_id: task.chain_id,
            entry_type: task.task_type,
            data,
        };
        let result = self.api.submit_entry(&code, &submission).await?;
        self.replace_snapshot(result.game_session.clone());
        Ok(result)
    }

    pub async fn results(&self) -> Result<Vec<Chain>, ClientError> {
        let (code, _) = self.identity()?;
        self.api.get_results(&code).await
    }

    /// Explicit leave: tell the server, then clear the rejoin hint. This is
    /// what distinguishes "I quit" from "my tab crashed" — only the former
    /// forgets the persisted `{code, nickname}`.
    pub async fn leave(&mut self) -> Result<Screen, ClientError> {
        if let Ok((code, nickname)) = self.identity() {
            if let Err(err) = self.api.leave_game(&code, &nickname).await {
                warn!("Leave call failed, clearing local state anyway: {}", err);
            }
        }
        self.detach()?;
        Ok(Screen::Menu)
    }

    /// React to a channel event. Reveal events drive the cursor; everything
    /// else is a hint to re-fetch. A failed re-fetch stays silent — the next
    /// poll or user action self-corrects.
    pub async fn handle_event(&mut self, event: &ServerEvent) -> Option<Screen> {
        match event {
            ServerEvent::RevealStep {
                chain_index,
                step_index,
            } => {
                let target = RevealCursor::new(*chain_index as usize, *step_index as usize);
                self.reveal = self.reveal.merge_forward(target);
                None
            }
            ServerEvent::RevealReset => {
                self.reveal = RevealCursor::reset();
                None
            }
            ServerEvent::Error { message } => {
                warn!("Channel error event: {}", message);
                None
            }
            _ => self.silent_refresh().await,
        }
    }

    /// Periodic poll while the game is not finished; the correctness
    /// backstop against missed channel events.
    pub async fn tick(&mut self) -> Option<Screen> {
        let active = self
            .attachment
            .as_ref()
            .is_some_and(|att| att.snapshot.status != GameStatus::Finished);
        if !active {
            return None;
        }
        self.silent_refresh().await
    }

    pub async fn refresh(&mut self) -> Result<Screen, ClientError> {
        let (code, nickname) = match self.identity() {
            Ok(identity) => identity,
            Err(_) => return Ok(Screen::Menu),
        };
        let session = self.api.get_game(&code).await?;
        if session.player_index(&nickname).is_none() {
            // Removed while we were away; the rejoin hint is stale.
            self.detach()?;
            return Ok(Screen::Menu);
        }
        self.replace_snapshot(session);
        Ok(self.screen())
    }

    pub fn reveal_cursor(&self) -> RevealCursor {
        self.reveal
    }

    /// Host-side reveal step: advance the local cursor and hand back the
    /// event to relay through the channel.
    pub fn advance_reveal(&mut self) -> Option<ClientEvent> {
        let att = self.attachment.as_ref()?;
        let next = self.reveal.advance(&att.snapshot.chains)?;
        self.reveal = next;
        Some(ClientEvent::RevealStep {
            chain_index: next.chain_index as u32,
            step_index: next.step_index as u32,
        })
    }

    pub fn reset_reveal(&mut self) -> ClientEvent {
        self.reveal = RevealCursor::reset();
        ClientEvent::RevealReset
    }

    async fn silent_refresh(&mut self) -> Option<Screen> {
        match self.refresh().await {
            Ok(screen) => Some(screen),
            Err(err) => {
                warn!("Refresh after channel hint failed: {}", err);
                None
            }
        }
    }

    fn identity(&self) -> Result<(String, String), ClientError> {
        self.attachment
            .as_ref()
            .map(|att| (att.code.clone(), att.nickname.clone()))
            .ok_or(ClientError::NotAttached)
    }

    fn replace_snapshot(&mut self, session: GameSession) {
        if let Some(att) = self.attachment.as_mut() {
            att.snapshot = session;
        }
    }

    fn attach(
        &mut self,
        code: String,
        nickname: String,
        snapshot: GameSession,
    ) -> Result<(), ClientError> {
        self.session_file.save(&SavedSession {
            code: code.clone(),
            nickname: nickname.clone(),
        })?;
        self.reveal = RevealCursor::reset();
        self.attachment = Some(Attachment {
            code,
            nickname,
            snapshot,
        });
        Ok(())
    }

    fn detach(&mut self) -> Result<(), ClientError> {
        self.session_file.clear()?;
        self.attachment = None;
        self.reveal = RevealCursor::reset();
        Ok(())
    }
}
