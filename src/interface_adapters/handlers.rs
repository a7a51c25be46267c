// HTTP handlers for the game API.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::domain::errors::GameError;
use crate::domain::token::Token;
use crate::interface_adapters::protocol::{
    direction_code, rounded_pair, BagItem, ErrorResponse, JoinRequest, JoinResponse, LostObject,
    MapListItem, MapResponse, PlayerActionRequest, PlayerName, PlayerState, RecordRow,
    StateResponse, TickRequest,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::game::MoveCommand;
use crate::use_cases::session::GameSession;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, code: &str, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
        }),
    )
}

fn invalid_argument(message: &str) -> ApiError {
    error_response(StatusCode::BAD_REQUEST, "invalidArgument", message)
}

fn invalid_token(message: &str) -> ApiError {
    error_response(StatusCode::UNAUTHORIZED, "invalidToken", message)
}

fn unknown_token() -> ApiError {
    error_response(
        StatusCode::UNAUTHORIZED,
        "unknownToken",
        "Player token has not been found",
    )
}

// Maps domain errors to the API envelope.
fn map_game_error(err: GameError) -> ApiError {
    match err {
        GameError::InvalidInput(message) => invalid_argument(&message),
        GameError::MapNotFound => {
            error_response(StatusCode::NOT_FOUND, "mapNotFound", "Map not found")
        }
        GameError::UnknownToken => unknown_token(),
        GameError::DuplicateMap(_) | GameError::DuplicateOffice(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internalError",
            "Registration conflict",
        ),
    }
}

// Pulls the 32-hex token out of the Bearer authorization header.
fn bearer_token(headers: &HeaderMap) -> Result<Token, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| invalid_token("Authorization header is required"))?
        .to_str()
        .map_err(|_| invalid_token("Invalid authorization format"))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| invalid_token("Invalid authorization format"))?;

    Token::parse(token).ok_or_else(|| invalid_token("Invalid token format"))
}

#[tracing::instrument(name = "join_game", skip_all, fields(map_id = %body.map_id))]
pub async fn join_game(
    State(state): State<AppState>,
    Json(body): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, ApiError> {
    let mut game = state.game.lock().await;
    let mut rng = StdRng::from_entropy();
    let outcome = game
        .join(
            &body.map_id,
            &body.user_name,
            state.randomize_spawn_points,
            &mut rng,
        )
        .map_err(map_game_error)?;

    tracing::info!(player_id = outcome.player_id, "player joined");

    Ok(Json(JoinResponse {
        auth_token: outcome.token.as_str().to_string(),
        player_id: outcome.player_id,
    }))
}

#[tracing::instrument(name = "player_action", skip_all)]
pub async fn player_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<PlayerActionRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let token = bearer_token(&headers)?;
    let command = MoveCommand::parse(&body.move_command)
        .ok_or_else(|| invalid_argument("Invalid move direction"))?;

    let mut game = state.game.lock().await;
    game.player_action(&token, command).map_err(map_game_error)?;

    Ok(Json(serde_json::json!({})))
}

#[tracing::instrument(name = "tick", skip_all)]
pub async fn tick(
    State(state): State<AppState>,
    Json(body): Json<TickRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.manual_tick {
        return Err(invalid_argument("Manual tick is disabled"));
    }
    if body.time_delta < 0 {
        return Err(invalid_argument("Invalid timeDelta value"));
    }

    let delta = Duration::from_millis(body.time_delta as u64);
    let mut game = state.game.lock().await;
    game.update_state(delta.as_secs_f64());
    for listener in state.tick_listeners.iter() {
        listener.on_tick(delta, &game);
    }

    Ok(Json(serde_json::json!({})))
}

fn session_state(session: &GameSession) -> StateResponse {
    let mut players = BTreeMap::new();
    for player in session.players() {
        let dog = player.dog();
        players.insert(
            player.id().to_string(),
            PlayerState {
                pos: rounded_pair(dog.position().x, dog.position().y),
                speed: rounded_pair(dog.speed().vx, dog.speed().vy),
                dir: direction_code(dog.direction()).to_string(),
                bag: player
                    .bag()
                    .iter()
                    .map(|loot| BagItem {
                        id: loot.id,
                        loot_type: loot.loot_type,
                    })
                    .collect(),
                score: player.score(),
            },
        );
    }

    let mut lost_objects = BTreeMap::new();
    for loot in session.loots() {
        lost_objects.insert(
            loot.id.to_string(),
            LostObject {
                loot_type: loot.loot_type,
                pos: rounded_pair(loot.position.x, loot.position.y),
            },
        );
    }

    StateResponse {
        players,
        lost_objects,
    }
}

#[tracing::instrument(name = "get_state", skip_all)]
pub async fn get_state(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StateResponse>, ApiError> {
    let token = bearer_token(&headers)?;
    let game = state.game.lock().await;
    let session = game.find_session_by_token(&token).ok_or_else(unknown_token)?;
    Ok(Json(session_state(session)))
}

#[tracing::instrument(name = "get_players", skip_all)]
pub async fn get_players(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BTreeMap<String, PlayerName>>, ApiError> {
    let token = bearer_token(&headers)?;
    let game = state.game.lock().await;
    let session = game.find_session_by_token(&token).ok_or_else(unknown_token)?;

    let players = session
        .players()
        .iter()
        .map(|player| {
            (
                player.id().to_string(),
                PlayerName {
                    name: player.dog().name().to_string(),
                },
            )
        })
        .collect();
    Ok(Json(players))
}

pub async fn get_maps(State(state): State<AppState>) -> Json<Vec<MapListItem>> {
    let game = state.game.lock().await;
    let maps = game
        .maps()
        .iter()
        .map(|map| MapListItem {
            id: map.id().to_string(),
            name: map.name().to_string(),
        })
        .collect();
    Json(maps)
}

pub async fn get_map(
    State(state): State<AppState>,
    Path(map_id): Path<String>,
) -> Result<Json<MapResponse>, ApiError> {
    let game = state.game.lock().await;
    let map = game
        .find_map(&map_id)
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "mapNotFound", "Map not found"))?;
    Ok(Json(MapResponse::from(map.as_ref())))
}

const RECORDS_MAX_ITEMS: i64 = 100;

#[tracing::instrument(name = "get_records", skip_all)]
pub async fn get_records(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<Vec<RecordRow>>, ApiError> {
    let start = match params.get("start") {
        Some(raw) => raw
            .parse::<i64>()
            .ok()
            .filter(|value| *value >= 0)
            .ok_or_else(|| invalid_argument("start must be a non-negative integer"))?,
        None => 0,
    };
    let max_items = match params.get("maxItems") {
        Some(raw) => {
            let value = raw
                .parse::<i64>()
                .map_err(|_| invalid_argument("Invalid maxItems parameter"))?;
            if value <= 0 {
                return Err(invalid_argument("maxItems must be positive"));
            }
            if value > RECORDS_MAX_ITEMS {
                return Err(invalid_argument("maxItems must not exceed 100"));
            }
            value
        }
        None => RECORDS_MAX_ITEMS,
    };

    let records = state
        .records
        .get_records(start as u64, max_items as u64)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to fetch records");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internalError",
                "Failed to fetch records",
            )
        })?;

    let rows = records
        .into_iter()
        .map(|record| RecordRow {
            name: record.name,
            score: record.score,
            play_time: record.play_time,
        })
        .collect();
    Ok(Json(rows))
}
