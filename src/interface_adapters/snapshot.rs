// Snapshot of the mutable game state to a file.
//
// Maps are not serialized; they are rebuilt from the immutable configuration
// on startup, and sessions reattach by map id. Saves are atomic: the JSON is
// written to `<path>.tmp` and renamed over the target.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::entities::{Dog, Loot, Player};
use crate::domain::geom::{Direction, Position, Speed};
use crate::domain::token::Token;
use crate::use_cases::game::Game;
use crate::use_cases::ticker::TickListener;

#[derive(Debug, Serialize, Deserialize)]
struct GameSnapshot {
    // Sessions stay raw so one corrupt session cannot sink the whole load.
    sessions: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionSnapshot {
    id: String,
    map_id: String,
    next_loot_id: u64,
    players: Vec<serde_json::Value>,
    loots: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PlayerSnapshot {
    id: u64,
    token: String,
    score: i64,
    bag_capacity: usize,
    dog: DogSnapshot,
    bag: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DogSnapshot {
    id: String,
    name: String,
    map_id: String,
    position: Position,
    speed: Speed,
    direction: Direction,
}

#[derive(Debug, Serialize, Deserialize)]
struct LootSnapshot {
    id: u64,
    #[serde(rename = "type")]
    loot_type: usize,
    value: i64,
    position: Position,
}

fn loot_snapshot(loot: &Loot) -> LootSnapshot {
    LootSnapshot {
        id: loot.id,
        loot_type: loot.loot_type,
        value: loot.value,
        position: loot.position.rounded(),
    }
}

fn player_snapshot(player: &Player) -> PlayerSnapshot {
    let dog = player.dog();
    PlayerSnapshot {
        id: player.id(),
        token: player.token().as_str().to_string(),
        score: player.score(),
        bag_capacity: player.bag_capacity(),
        dog: DogSnapshot {
            id: dog.id().to_string(),
            name: dog.name().to_string(),
            map_id: dog.map_id().to_string(),
            position: dog.position().rounded(),
            speed: dog.speed().rounded(),
            direction: dog.direction(),
        },
        bag: player
            .bag()
            .iter()
            .map(|loot| serde_json::to_value(loot_snapshot(loot)).expect("loot serializes"))
            .collect(),
    }
}

/// Serializes the full session graph and atomically replaces `path`.
pub fn save_game(game: &Game, path: &Path) -> io::Result<()> {
    let snapshot = GameSnapshot {
        sessions: game
            .sessions()
            .iter()
            .map(|session| {
                let snapshot = SessionSnapshot {
                    id: session.id().to_string(),
                    map_id: session.map().id().to_string(),
                    next_loot_id: session.next_loot_id(),
                    players: session
                        .players()
                        .iter()
                        .map(|player| {
                            serde_json::to_value(player_snapshot(player))
                                .expect("player serializes")
                        })
                        .collect(),
                    loots: session
                        .loots()
                        .iter()
                        .map(|loot| {
                            serde_json::to_value(loot_snapshot(loot)).expect("loot serializes")
                        })
                        .collect(),
                };
                serde_json::to_value(snapshot).expect("session serializes")
            })
            .collect(),
    };

    let body = serde_json::to_string(&snapshot)?;
    let tmp_path = tmp_path_for(path);
    std::fs::write(&tmp_path, body)?;
    std::fs::rename(&tmp_path, path)
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Restores sessions from a snapshot file.
///
/// A missing or empty file starts fresh. Individual players, bag items and
/// loots that fail to parse are logged and skipped; a session that cannot be
/// attached to a known map is skipped whole.
pub fn load_game(game: &mut Game, path: &Path) -> io::Result<()> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no saved state, starting fresh");
        return Ok(());
    }
    let body = std::fs::read_to_string(path)?;
    if body.trim().is_empty() {
        tracing::info!(path = %path.display(), "state file is empty, starting fresh");
        return Ok(());
    }

    let snapshot: GameSnapshot = serde_json::from_str(&body)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

    let mut max_player_id: Option<u64> = None;
    for session_value in snapshot.sessions {
        let session: SessionSnapshot = match serde_json::from_value(session_value) {
            Ok(session) => session,
            Err(err) => {
                tracing::error!(error = %err, "failed to deserialize session, skipping");
                continue;
            }
        };

        let restored = match restore_session(game, session) {
            Ok(max_id) => max_id,
            Err(err) => {
                tracing::error!(error = %err, "failed to restore session, skipping");
                continue;
            }
        };
        if let Some(id) = restored {
            max_player_id = Some(max_player_id.map_or(id, |current| current.max(id)));
        }
    }

    if let Some(max_id) = max_player_id {
        game.ensure_next_player_id(max_id + 1);
    }
    Ok(())
}

fn restore_session(game: &mut Game, snapshot: SessionSnapshot) -> Result<Option<u64>, String> {
    let session = game
        .get_or_create_session(&snapshot.map_id)
        .map_err(|err| format!("map {}: {err:?}", snapshot.map_id))?;
    session.set_next_loot_id(snapshot.next_loot_id);

    let mut max_player_id = None;
    for player_value in snapshot.players {
        match restore_player(player_value) {
            Ok(player) => {
                max_player_id = Some(
                    max_player_id.map_or(player.id(), |current: u64| current.max(player.id())),
                );
                session.add_player(player);
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to deserialize player, skipping");
            }
        }
    }

    for loot_value in snapshot.loots {
        match serde_json::from_value::<LootSnapshot>(loot_value) {
            Ok(loot) => session.add_loot(Loot::new(
                loot.id,
                loot.loot_type,
                loot.position,
                loot.value,
            )),
            Err(err) => {
                tracing::error!(error = %err, "failed to deserialize loot, skipping");
            }
        }
    }

    Ok(max_player_id)
}

fn restore_player(value: serde_json::Value) -> Result<Player, String> {
    let snapshot: PlayerSnapshot =
        serde_json::from_value(value).map_err(|err| err.to_string())?;
    let token = Token::parse(&snapshot.token)
        .ok_or_else(|| format!("malformed token for player {}", snapshot.id))?;

    let mut dog = Dog::new(snapshot.dog.id, snapshot.dog.name, snapshot.dog.map_id);
    dog.set_position(snapshot.dog.position);
    dog.set_previous_position(snapshot.dog.position);
    dog.set_speed(snapshot.dog.speed);
    dog.set_direction(snapshot.dog.direction);

    let mut player = Player::new(snapshot.id, dog, token, snapshot.bag_capacity);
    player.add_score(snapshot.score);
    for item_value in snapshot.bag {
        match serde_json::from_value::<LootSnapshot>(item_value) {
            Ok(item) => player.add_to_bag(Loot::new(
                item.id,
                item.loot_type,
                item.position,
                item.value,
            )),
            Err(err) => {
                tracing::error!(error = %err, "failed to deserialize bag item, skipping");
            }
        }
    }
    Ok(player)
}

/// Autosaving tick observer; also used for the final save on shutdown.
pub struct SnapshotListener {
    path: PathBuf,
    save_period: Duration,
    since_last_save: Mutex<Duration>,
}

impl SnapshotListener {
    pub fn new(path: PathBuf, save_period: Duration) -> Self {
        Self {
            path,
            save_period,
            since_last_save: Mutex::new(Duration::ZERO),
        }
    }

    pub fn save_now(&self, game: &Game) {
        match save_game(game, &self.path) {
            Ok(()) => tracing::info!(path = %self.path.display(), "game state saved"),
            Err(err) => tracing::error!(error = %err, "failed to save game state"),
        }
    }
}

impl TickListener for SnapshotListener {
    fn on_tick(&self, delta: Duration, game: &Game) {
        // Zero period means autosave is off; save_now still works.
        if self.save_period.is_zero() {
            return;
        }
        let mut since_last_save = self.since_last_save.lock().expect("save timer poisoned");
        *since_last_save += delta;
        if *since_last_save < self.save_period {
            return;
        }
        *since_last_save = Duration::ZERO;
        drop(since_last_save);

        match save_game(game, &self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "auto-saved game state"),
            Err(err) => tracing::error!(error = %err, "failed to auto-save game state"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geom::Offset;
    use crate::domain::map::{LootType, Map, Office, Road};
    use crate::use_cases::game::{LootGeneratorConfig, MoveCommand};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn temp_state_file(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("fetch-server-{tag}-{}.json", std::process::id()))
    }

    fn town_map() -> Map {
        let mut map = Map::new("town".into(), "Town".into());
        map.add_road(Road::horizontal(Position::new(0.0, 0.0), 10.0));
        map.add_road(Road::vertical(Position::new(10.0, 0.0), 8.0));
        map.set_dog_speed(3.0);
        map.set_bag_capacity(2);
        map.set_loot_types(vec![LootType {
            value: 7,
            data: serde_json::json!({"name": "bone", "value": 7}),
        }]);
        map.add_office(Office {
            id: "o1".into(),
            position: Position::new(10.0, 0.0),
            offset: Offset { dx: 5.0, dy: 0.0 },
        })
        .unwrap();
        map
    }

    fn populated_game() -> (Game, Token) {
        let mut game = Game::new();
        game.add_map(town_map()).unwrap();
        game.set_loot_generator_config(LootGeneratorConfig {
            period: Duration::from_secs(5),
            probability: 0.5,
        });
        let mut rng = StdRng::seed_from_u64(17);
        let outcome = game.join("town", "Rex", true, &mut rng).unwrap();
        game.join("town", "Lucky", false, &mut rng).unwrap();
        game.player_action(&outcome.token, MoveCommand::Right).unwrap();
        game.update_state(0.25);
        (game, outcome.token)
    }

    #[test]
    fn round_trip_preserves_sessions_players_and_loot() {
        let (mut game, token) = populated_game();
        {
            // Park some loot in the world and a bag so both paths serialize.
            let session = game.get_or_create_session("town").unwrap();
            session.add_loot(Loot::new(
                session.next_loot_id(),
                0,
                Position::new(4.0, 0.0),
                7,
            ));
            let next = session.next_loot_id() + 1;
            session.set_next_loot_id(next);
            session.players_mut()[0].add_to_bag(Loot::new(99, 0, Position::new(1.0, 0.0), 7));
            session.players_mut()[0].add_score(21);
        }

        let path = temp_state_file("round-trip");
        save_game(&game, &path).unwrap();

        let mut restored = Game::new();
        restored.add_map(town_map()).unwrap();
        load_game(&mut restored, &path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(restored.sessions().len(), 1);
        let original = game.find_session_by_map_id("town").unwrap();
        let session = restored.find_session_by_map_id("town").unwrap();
        assert_eq!(session.next_loot_id(), original.next_loot_id());
        assert_eq!(session.players().len(), 2);
        assert_eq!(session.loots().len(), original.loots().len());

        let player = session.find_player_by_token(&token).unwrap();
        let original_player = original.find_player_by_token(&token).unwrap();
        assert_eq!(player.score(), original_player.score());
        assert_eq!(player.bag_capacity(), original_player.bag_capacity());
        assert_eq!(player.bag().len(), original_player.bag().len());
        assert_eq!(player.dog().name(), "Rex");
        assert_eq!(player.dog().direction(), original_player.dog().direction());
        // Coordinates survive modulo the 6-decimal rounding applied on save.
        let pos = player.dog().position();
        let original_pos = original_player.dog().position().rounded();
        assert_eq!(pos, original_pos);
    }

    #[test]
    fn restored_game_keeps_player_ids_unique() {
        let (game, _) = populated_game();
        let path = temp_state_file("player-ids");
        save_game(&game, &path).unwrap();

        let mut restored = Game::new();
        restored.add_map(town_map()).unwrap();
        load_game(&mut restored, &path).unwrap();
        std::fs::remove_file(&path).ok();

        let mut rng = StdRng::seed_from_u64(3);
        let outcome = restored.join("town", "Newcomer", false, &mut rng).unwrap();
        let mut ids: Vec<u64> = restored.sessions()[0]
            .players()
            .iter()
            .map(|player| player.id())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), restored.sessions()[0].players().len());
        assert_eq!(outcome.player_id, 2);
    }

    #[test]
    fn missing_file_starts_fresh() {
        let mut game = Game::new();
        game.add_map(town_map()).unwrap();
        let path = temp_state_file("missing");
        std::fs::remove_file(&path).ok();
        load_game(&mut game, &path).unwrap();
        assert!(game.sessions().is_empty());
    }

    #[test]
    fn corrupt_player_is_skipped_but_session_survives() {
        let (game, _) = populated_game();
        let path = temp_state_file("corrupt-player");
        save_game(&game, &path).unwrap();

        // Break one player's token in the stored JSON.
        let mut value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        value["sessions"][0]["players"][0]["token"] = serde_json::json!("not-a-token");
        std::fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

        let mut restored = Game::new();
        restored.add_map(town_map()).unwrap();
        load_game(&mut restored, &path).unwrap();
        std::fs::remove_file(&path).ok();

        let session = restored.find_session_by_map_id("town").unwrap();
        assert_eq!(session.players().len(), 1);
    }

    #[test]
    fn session_for_unknown_map_is_skipped() {
        let (game, _) = populated_game();
        let path = temp_state_file("unknown-map");
        save_game(&game, &path).unwrap();

        // Restore into a game that knows a different map.
        let mut other = Map::new("harbor".into(), "Harbor".into());
        other.add_road(Road::horizontal(Position::new(0.0, 0.0), 4.0));
        let mut restored = Game::new();
        restored.add_map(other).unwrap();
        load_game(&mut restored, &path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(restored.sessions().is_empty());
    }

    #[test]
    fn listener_saves_only_after_the_period_elapses() {
        let (game, _) = populated_game();
        let path = temp_state_file("listener");
        std::fs::remove_file(&path).ok();

        let listener = SnapshotListener::new(path.clone(), Duration::from_secs(2));
        listener.on_tick(Duration::from_secs(1), &game);
        assert!(!path.exists());
        listener.on_tick(Duration::from_secs(1), &game);
        assert!(path.exists());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn zero_save_period_disables_autosave_but_not_save_now() {
        let (game, _) = populated_game();
        let path = temp_state_file("zero-period");
        std::fs::remove_file(&path).ok();

        let listener = SnapshotListener::new(path.clone(), Duration::ZERO);
        listener.on_tick(Duration::from_secs(60), &game);
        assert!(!path.exists());
        listener.save_now(&game);
        assert!(path.exists());
        std::fs::remove_file(&path).ok();
    }
}
