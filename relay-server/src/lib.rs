use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::Filter;

use crate::store::SessionStore;
use crate::websocket::handlers::MessageHandler;
use crate::websocket::ConnectionManager;
use relay_core::{normalize_code, RoundAdvance};
use relay_types::{Chain, EntrySubmission, GameError, ServerEvent};

pub mod config;
pub mod hooks;
pub mod store;
pub mod websocket;

#[derive(Deserialize)]
struct CreateGameRequest {
    nickname: String,
    user_id: Option<Uuid>,
}

#[derive(Deserialize)]
struct JoinGameRequest {
    code: String,
    nickname: String,
    user_id: Option<Uuid>,
}

#[derive(Deserialize)]
struct HostActionRequest {
    nickname: String,
}

#[derive(Deserialize)]
struct LeaveGameRequest {
    nickname: String,
}

#[derive(serde::Serialize)]
struct GameResultsResponse {
    chains: Vec<Chain>,
}

pub fn create_routes(
    store: Arc<SessionStore>,
    connection_manager: Arc<ConnectionManager>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    // Clone for filters
    let store_filter = warp::any().map({
        let store = store.clone();
        move || store.clone()
    });

    let connection_manager_filter = warp::any().map({
        let connection_manager = connection_manager.clone();
        move || connection_manager.clone()
    });

    // WebSocket endpoint: the per-code event channel
    let websocket = warp::path("ws")
        .and(warp::ws())
        .and(connection_manager_filter.clone())
        .and(store_filter.clone())
        .map(
            |ws: warp::ws::Ws, conn_mgr: Arc<ConnectionManager>, store: Arc<SessionStore>| {
                ws.on_upgrade(move |socket| websocket::handle_connection(socket, conn_mgr, store))
            },
        );

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    let create_game = warp::path!("game" / "create")
        .and(warp::post())
        .and(warp::body::json())
        .and(store_filter.clone())
        .and_then(handle_create_game);

    let join_game = warp::path!("game" / "join")
        .and(warp::post())
        .and(warp::body::json())
        .and(store_filter.clone())
        .and(connection_manager_filter.clone())
        .and_then(handle_join_game);

    let get_game = warp::path!("game" / String)
        .and(warp::get())
        .and(store_filter.clone())
        .and_then(handle_get_game);

    let start_game = warp::path!("game" / String / "start")
        .and(warp::post())
        .and(warp::body::json())
        .and(store_filter.clone())
        .and(connection_manager_filter.clone())
        .and_then(handle_start_game);

    let get_task = warp::path!("game" / String / "task" / String)
        .and(warp::get())
        .and(store_filter.clone())
        .and_then(handle_get_task);

    let submit_entry = warp::path!("game" / String / "submit-entry")
        .and(warp::post())
        .and(warp::body::json())
        .and(store_filter.clone())
        .and(connection_manager_filter.clone())
        .and_then(handle_submit_entry);

    let end_game = warp::path!("game" / String / "end")
        .and(warp::post())
        .and(warp::body::json())
        .and(store_filter.clone())
        .and(connection_manager_filter.clone())
        .and_then(handle_end_game);

    let leave_game = warp::path!("game" / String / "leave")
        .and(warp::post())
        .and(warp::body::json())
        .and(store_filter.clone())
        .and(connection_manager_filter.clone())
        .and_then(handle_leave_game);

    let get_results = warp::path!("game" / String / "results")
        .and(warp::get())
        .and(store_filter.clone())
        .and_then(handle_get_results);

    // CORS configuration
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST"]);

    websocket
        .or(health)
        .or(create_game)
        .or(join_game)
        .or(start_game)
        .or(get_task)
        .or(submit_entry)
        .or(end_game)
        .or(leave_game)
        .or(get_results)
        .or(get_game)
        .with(cors)
        .with(warp::log("arthive_relay"))
}

fn error_reply(err: &GameError) -> warp::reply::WithStatus<warp::reply::Json> {
    let status = match err {
        GameError::NotFound { .. } | GameError::PlayerNotFound { .. } => StatusCode::NOT_FOUND,
        GameError::AlreadyStarted { .. }
        | GameError::DuplicateNickname { .. }
        | GameError::DuplicateSubmission { .. }
        | GameError::InvalidState { .. } => StatusCode::CONFLICT,
        GameError::NotEnoughPlayers { .. } | GameError::InvalidEntry { .. } => {
            StatusCode::BAD_REQUEST
        }
        GameError::NotHost => StatusCode::FORBIDDEN,
        GameError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    warp::reply::with_status(
        warp::reply::json(&serde_json::json!({ "error": err.to_string() })),
        status,
    )
}

fn json_reply<T: serde::Serialize>(value: &T) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(value), StatusCode::OK)
}

async fn handle_create_game(
    request: CreateGameRequest,
    store: Arc<SessionStore>,
) -> Result<impl warp::Reply, warp::Rejection> {
    match store.create(&request.nickname, request.user_id).await {
        Ok(session) => Ok(json_reply(&session)),
        Err(err) => Ok(error_reply(&err)),
    }
}

async fn handle_join_game(
    request: JoinGameRequest,
    store: Arc<SessionStore>,
    connection_manager: Arc<ConnectionManager>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let code = normalize_code(&request.code);
    match store
        .join(&code, &request.nickname, request.user_id)
        .await
    {
        Ok(session) => {
            // Hint the room; everyone re-fetches the session on receipt.
            connection_manager
                .send_to_room(
                    &code,
                    ServerEvent::PlayerJoined {
                        nickname: request.nickname.trim().to_string(),
                    },
                )
                .await;
            Ok(json_reply(&session))
        }
        Err(err) => Ok(error_reply(&err)),
    }
}

async fn handle_get_game(
    code: String,
    store: Arc<SessionStore>,
) -> Result<impl warp::Reply, warp::Rejection> {
    match store.get(&code).await {
        Ok(session) => Ok(json_reply(&session)),
        Err(err) => Ok(error_reply(&err)),
    }
}

async fn handle_start_game(
    code: String,
    request: HostActionRequest,
    store: Arc<SessionStore>,
    connection_manager: Arc<ConnectionManager>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let code = normalize_code(&code);
    match store.start(&code, &request.nickname).await {
        Ok(session) => {
            connection_manager
                .send_to_room(&code, ServerEvent::GameStarted)
                .await;
            Ok(json_reply(&session))
        }
        Err(err) => Ok(error_reply(&err)),
    }
}

async fn handle_get_task(
    code: String,
    nickname: String,
    store: Arc<SessionStore>,
) -> Result<impl warp::Reply, warp::Rejection> {
    match store.task(&code, &nickname).await {
        Ok(task) => Ok(json_reply(&task)),
        Err(err) => Ok(error_reply(&err)),
    }
}

async fn handle_submit_entry(
    code: String,
    submission: EntrySubmission,
    store: Arc<SessionStore>,
    connection_manager: Arc<ConnectionManager>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let code = normalize_code(&code);
    match store.submit(&code, &submission).await {
        Ok((result, advance)) => {
            connection_manager
                .send_to_room_except_player(
                    &code,
                    &submission.player_nickname,
                    ServerEvent::PlayerSubmitted {
                        nickname: submission.player_nickname.clone(),
                        submitted_count: result.submitted_count,
                        total_players: result.total_players,
                    },
                )
                .await;
            match advance {
                RoundAdvance::NextRound(round) => {
                    connection_manager
                        .send_to_room(&code, ServerEvent::NextRound { round })
                        .await;
                }
                RoundAdvance::Finished => {
                    connection_manager
                        .send_to_room(&code, ServerEvent::GameEnded)
                        .await;
                }
                RoundAdvance::None => {}
            }
            Ok(json_reply(&result))
        }
        Err(err) => Ok(error_reply(&err)),
    }
}

async fn handle_end_game(
    code: String,
    request: HostActionRequest,
    store: Arc<SessionStore>,
    connection_manager: Arc<ConnectionManager>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let code = normalize_code(&code);
    match store.end(&code, &request.nickname).await {
        Ok(session) => {
            connection_manager
                .send_to_room(&code, ServerEvent::GameEnded)
                .await;
            Ok(json_reply(&session))
        }
        Err(err) => Ok(error_reply(&err)),
    }
}

async fn handle_leave_game(
    code: String,
    request: LeaveGameRequest,
    store: Arc<SessionStore>,
    connection_manager: Arc<ConnectionManager>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let code = normalize_code(&code);
    match store.leave(&code, &request.nickname).await {
        Ok((advance, _session)) => {
            MessageHandler::broadcast_leave(
                &connection_manager,
                &code,
                &request.nickname,
                advance,
            )
            .await;
            Ok(json_reply(&serde_json::json!({})))
        }
        Err(err) => Ok(error_reply(&err)),
    }
}

async fn handle_get_results(
    code: String,
    store: Arc<SessionStore>,
) -> Result<impl warp::Reply, warp::Rejection> {
    match store.results(&code).await {
        Ok(chains) => Ok(json_reply(&GameResultsResponse { chains })),
        Err(err) => Ok(error_reply(&err)),
    }
}
