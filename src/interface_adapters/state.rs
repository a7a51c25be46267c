use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::ports::RecordStore;
use crate::use_cases::game::Game;
use crate::use_cases::ticker::TickListener;

// Application state shared by all handlers.
//
// Every state-mutating route locks `game`, so at any instant exactly one of
// tick/join/action/query runs; the core relies on this external
// serialization instead of internal locks.
#[derive(Clone)]
pub struct AppState {
    pub game: Arc<Mutex<Game>>,
    pub records: Arc<dyn RecordStore>,
    pub tick_listeners: Arc<Vec<Arc<dyn TickListener>>>,
    /// True when no periodic loop runs and POST /game/tick drives time.
    pub manual_tick: bool,
    pub randomize_spawn_points: bool,
}
