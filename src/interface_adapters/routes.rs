use axum::{
    routing::{get, post},
    Router,
};

use crate::interface_adapters::handlers::{
    get_map, get_maps, get_players, get_records, get_state, join_game, player_action, tick,
};
use crate::interface_adapters::state::AppState;

pub fn app(state: AppState) -> Router {
    // Wire the HTTP routes to their handlers.
    Router::new()
        .route("/api/v1/game/join", post(join_game))
        .route("/api/v1/game/player/action", post(player_action))
        .route("/api/v1/game/tick", post(tick))
        .route("/api/v1/game/state", get(get_state))
        .route("/api/v1/game/players", get(get_players))
        .route("/api/v1/game/records", get(get_records))
        .route("/api/v1/maps", get(get_maps))
        .route("/api/v1/maps/:map_id", get(get_map))
        .with_state(state)
}
