use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// One seat in a game session. The game is nickname-keyed; `user_id` is only
/// carried through so a signed-in ArtHive account can be credited afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionPlayer {
    pub nickname: String,
    pub user_id: Option<Uuid>,
}

impl SessionPlayer {
    pub fn new(nickname: impl Into<String>, user_id: Option<Uuid>) -> Self {
        Self {
            nickname: nickname.into(),
            user_id,
        }
    }
}
