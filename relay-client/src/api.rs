use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use relay_types::{Chain, EntrySubmission, GameSession, SubmissionResult, TaskAssignment};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("channel failed: {0}")]
    Channel(#[from] tokio_tungstenite::tungstenite::Error),
    /// A game-logic rejection from the server, carrying its error message.
    #[error("{0}")]
    Api(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not attached to a game")]
    NotAttached,
}

#[derive(Deserialize)]
struct GameResultsResponse {
    chains: Vec<Chain>,
}

/// Thin wrapper over the relay server's REST surface. Every call returns the
/// server's authoritative view; callers replace, never merge, their local
/// snapshot with it.
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// The matching WebSocket endpoint for this server.
    pub fn ws_url(&self) -> String {
        let base = self
            .base_url
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        format!("{base}/ws")
    }

    pub async fn create_game(
        &self,
        nickname: &str,
        user_id: Option<Uuid>,
    ) -> Result<GameSession, ClientError> {
        self.post_json(
            "game/create",
            &serde_json::json!({ "nickname": nickname, "user_id": user_id }),
        )
        .await
    }

    pub async fn join_game(
        &self,
        code: &str,
        nickname: &str,
        user_id: Option<Uuid>,
    ) -> Result<GameSession, ClientError> {
        self.post_json(
            "game/join",
            &serde_json::json!({ "code": code, "nickname": nickname, "user_id": user_id }),
        )
        .await
    }

    pub async fn get_game(&self, code: &str) -> Result<GameSession, ClientError> {
        self.get_json(&format!("game/{code}")).await
    }

    pub async fn start_game(&self, code: &str, nickname: &str) -> Result<GameSession, ClientError> {
        self.post_json(
            &format!("game/{code}/start"),
            &serde_json::json!({ "nickname": nickname }),
        )
        .await
    }

    pub async fn get_task(
        &self,
        code: &str,
        nickname: &str,
    ) -> Result<TaskAssignment, ClientError> {
        self.get_json(&format!("game/{code}/task/{nickname}")).await
    }

    pub async fn submit_entry(
        &self,
        code: &str,
        submission: &EntrySubmission,
    ) -> Result<SubmissionResult, ClientError> {
        self.post_json(&format!("game/{code}/submit-entry"), submission)
            .await
    }

    pub async fn end_game(&self, code: &str, nickname: &str) -> Result<GameSession, ClientError> {
        self.post_json(
            &format!("game/{code}/end"),
            &serde_json::json!({ "nickname": nickname }),
        )
        .await
    }

    pub async fn leave_game(&self, code: &str, nickname: &str) -> Result<(), ClientError> {
        let _: serde_json::Value = self
            .post_json(
                &format!("game/{code}/leave"),
                &serde_json::json!({ "nickname": nickname }),
            )
            .await?;
        Ok(())
    }

    pub async fn get_results(&self, code: &str) -> Result<Vec<Chain>, ClientError> {
        let response: GameResultsResponse = self.get_json(&format!("game/{code}/results")).await?;
        Ok(response.chains)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, ClientError> {
        let response = self
            .http
            .post(format!("{}/{path}", self.base_url))
            .json(body)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self
            .http
            .get(format!("{}/{path}", self.base_url))
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        if response.status().is_success() {
            return Ok(response.json().await?);
        }
        let body: serde_json::Value = response
            .json()
            .await
            .unwrap_or(serde_json::Value::Null);
        let message = body
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("server error")
            .to_string();
        Err(ClientError::Api(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_swaps_scheme_and_appends_path() {
        let api = ApiClient::new("http://localhost:8080/");
        assert_eq!(api.ws_url(), "ws://localhost:8080/ws");

        let api = ApiClient::new("https://arthive.example");
        assert_eq!(api.ws_url(), "wss://arthive.example/ws");
    }
}
