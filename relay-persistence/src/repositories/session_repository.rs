use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::entities::{game_sessions, prelude::*};
use relay_types::{Chain, GameSession, GameStatus, SessionPlayer};

pub struct SessionRepository {
    db: DatabaseConnection,
}

impl SessionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_session(model: game_sessions::Model) -> Result<GameSession> {
        let players: Vec<SessionPlayer> = serde_json::from_str(&model.players)?;
        let chains: Vec<Chain> = serde_json::from_str(&model.chains)?;

        Ok(GameSession {
            code: model.code,
            host_nickname: model.host_nickname,
            players,
            status: parse_status(&model.status)?,
            total_rounds: model.total_rounds as u32,
            current_round: model.current_round as u32,
            chains,
            created_at: model.created_at.to_rfc3339(),
        })
    }

    fn session_to_model(session: &GameSession) -> Result<game_sessions::ActiveModel> {
        let now = Utc::now();
        let created_at = DateTime::parse_from_rfc3339(&session.created_at)
            .unwrap_or_else(|_| now.into());

        Ok(game_sessions::ActiveModel {
            code: Set(session.code.clone()),
            host_nickname: Set(session.host_nickname.clone()),
            status: Set(session.status.as_str().to_string()),
            current_round: Set(session.current_round as i32),
            total_rounds: Set(session.total_rounds as i32),
            players: Set(serde_json::to_string(&session.players)?),
            chains: Set(serde_json::to_string(&session.chains)?),
            created_at: Set(created_at),
            updated_at: Set(now.into()),
            finished_at: Set((session.status == GameStatus::Finished).then(|| now.into())),
        })
    }

    /// Write-through upsert keyed by code.
    pub async fn save(&self, session: &GameSession) -> Result<()> {
        let model = Self::session_to_model(session)?;

        GameSessions::insert(model)
            .on_conflict(
                OnConflict::column(game_sessions::Column::Code)
                    .update_columns([
                        game_sessions::Column::HostNickname,
                        game_sessions::Column::Status,
                        game_sessions::Column::CurrentRound,
                        game_sessions::Column::TotalRounds,
                        game_sessions::Column::Players,
                        game_sessions::Column::Chains,
                        game_sessions::Column::UpdatedAt,
                        game_sessions::Column::FinishedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<GameSession>> {
        let model = GameSessions::find_by_id(code.to_string())
            .one(&self.db)
            .await?;
        model.map(Self::model_to_session).transpose()
    }

    pub async fn exists(&self, code: &str) -> Result<bool> {
        Ok(GameSessions::find_by_id(code.to_string())
            .one(&self.db)
            .await?
            .is_some())
    }

    pub async fn delete(&self, code: &str) -> Result<()> {
        GameSessions::delete_by_id(code.to_string())
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Sweep finished sessions untouched since `cutoff`.
    pub async fn delete_stale_finished(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = GameSessions::delete_many()
            .filter(game_sessions::Column::Status.eq(GameStatus::Finished.as_str()))
            .filter(game_sessions::Column::UpdatedAt.lt(cutoff))
            .exec(&self.db)
            .await?;

        if result.rows_affected > 0 {
            tracing::info!(
                removed = result.rows_affected,
                "swept stale finished game sessions"
            );
        }
        Ok(result.rows_affected)
    }
}

fn parse_status(raw: &str) -> Result<GameStatus> {
    match raw {
        "waiting" => Ok(GameStatus::Waiting),
        "in-progress" => Ok(GameStatus::InProgress),
        "finished" => Ok(GameStatus::Finished),
        other => Err(anyhow::anyhow!("unknown game status {other:?} in storage")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use migration::{Migrator, MigratorTrait};
    use relay_types::{Entry, EntryType};

    async fn test_repository() -> SessionRepository {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        SessionRepository::new(db)
    }

    fn sample_session(code: &str, status: GameStatus) -> GameSession {
        GameSession {
            code: code.to_string(),
            host_nickname: "Ann".to_string(),
            players: vec![
                SessionPlayer::new("Ann", None),
                SessionPlayer::new("Ben", None),
            ],
            status,
            total_rounds: 2,
            current_round: 1,
            chains: vec![Chain {
                chain_id: 0,
                original_player: "Ann".to_string(),
                original_prompt: Some("a flying cat".to_string()),
                entries: vec![Entry {
                    round: 1,
                    player_nickname: "Ann".to_string(),
                    entry_type: EntryType::Prompt,
                    data: "a flying cat".to_string(),
                }],
            }],
            created_at: Utc::now().to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn save_and_find_round_trips_the_aggregate() {
        let repo = test_repository().await;
        let session = sample_session("ABC234", GameStatus::InProgress);

        repo.save(&session).await.unwrap();
        let loaded = repo.find_by_code("ABC234").await.unwrap().unwrap();

        assert_eq!(loaded.code, session.code);
        assert_eq!(loaded.status, GameStatus::InProgress);
        assert_eq!(loaded.players, session.players);
        assert_eq!(loaded.chains, session.chains);
    }

    #[tokio::test]
    async fn save_twice_updates_in_place() {
        let repo = test_repository().await;
        let mut session = sample_session("ABC234", GameStatus::InProgress);
        repo.save(&session).await.unwrap();

        session.current_round = 2;
        session.status = GameStatus::Finished;
        repo.save(&session).await.unwrap();

        let loaded = repo.find_by_code("ABC234").await.unwrap().unwrap();
        assert_eq!(loaded.current_round, 2);
        assert_eq!(loaded.status, GameStatus::Finished);
    }

    #[tokio::test]
    async fn find_unknown_code_is_none() {
        let repo = test_repository().await;
        assert!(repo.find_by_code("NOPE42").await.unwrap().is_none());
        assert!(!repo.exists("NOPE42").await.unwrap());
    }

    #[tokio::test]
    async fn stale_sweep_only_touches_finished_sessions() {
        let repo = test_repository().await;
        repo.save(&sample_session("AAAAAA", GameStatus::Finished))
            .await
            .unwrap();
        repo.save(&sample_session("BBBBBB", GameStatus::InProgress))
            .await
            .unwrap();

        let cutoff = Utc::now() + chrono::Duration::seconds(5);
        let removed = repo.delete_stale_finished(cutoff).await.unwrap();

        assert_eq!(removed, 1);
        assert!(repo.find_by_code("AAAAAA").await.unwrap().is_none());
        assert!(repo.find_by_code("BBBBBB").await.unwrap().is_some());
    }
}
