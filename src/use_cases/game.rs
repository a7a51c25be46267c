// Game-level composition: the map registry, one session per map, join and
// player-action flows, and the tick fan-out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::domain::entities::{Dog, Player};
use crate::domain::errors::GameError;
use crate::domain::geom::{Direction, Speed};
use crate::domain::loot_generator::LootGenerator;
use crate::domain::map::Map;
use crate::domain::ports::RetiredPlayerSink;
use crate::domain::token::Token;
use crate::use_cases::session::{GameSession, TickHooks};

/// Generator settings shared by all sessions; each session gets its own
/// generator instance (and its own randomness) cloned from this.
#[derive(Debug, Clone, Copy)]
pub struct LootGeneratorConfig {
    pub period: Duration,
    pub probability: f64,
}

/// A parsed player move request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveCommand {
    Left,
    Right,
    Up,
    Down,
    Stop,
}

impl MoveCommand {
    /// Parses the wire code: L/R/U/D or the empty string for stop.
    pub fn parse(code: &str) -> Option<MoveCommand> {
        match code {
            "L" => Some(MoveCommand::Left),
            "R" => Some(MoveCommand::Right),
            "U" => Some(MoveCommand::Up),
            "D" => Some(MoveCommand::Down),
            "" => Some(MoveCommand::Stop),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    pub token: Token,
    pub player_id: u64,
}

pub struct Game {
    maps: Vec<Arc<Map>>,
    map_index: HashMap<String, usize>,
    sessions: Vec<GameSession>,
    loot_generator_config: Option<LootGeneratorConfig>,
    dog_retirement_time: f64,
    retired_sink: Option<RetiredPlayerSink>,
    next_player_id: u64,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    pub fn new() -> Self {
        Self {
            maps: Vec::new(),
            map_index: HashMap::new(),
            sessions: Vec::new(),
            loot_generator_config: None,
            dog_retirement_time: 60.0,
            retired_sink: None,
            next_player_id: 0,
        }
    }

    pub fn maps(&self) -> &[Arc<Map>] {
        &self.maps
    }

    pub fn sessions(&self) -> &[GameSession] {
        &self.sessions
    }

    pub fn add_map(&mut self, map: Map) -> Result<(), GameError> {
        if self.map_index.contains_key(map.id()) {
            return Err(GameError::DuplicateMap(map.id().to_string()));
        }
        self.map_index.insert(map.id().to_string(), self.maps.len());
        self.maps.push(Arc::new(map));
        Ok(())
    }

    pub fn find_map(&self, map_id: &str) -> Option<&Arc<Map>> {
        self.map_index.get(map_id).map(|&index| &self.maps[index])
    }

    pub fn set_loot_generator_config(&mut self, config: LootGeneratorConfig) {
        self.loot_generator_config = Some(config);
    }

    pub fn dog_retirement_time(&self) -> f64 {
        self.dog_retirement_time
    }

    pub fn set_dog_retirement_time(&mut self, seconds: f64) {
        self.dog_retirement_time = seconds;
    }

    /// Installs the callback fired once per retired player. The host wires
    /// this before the first tick.
    pub fn set_retired_player_sink(&mut self, sink: RetiredPlayerSink) {
        self.retired_sink = Some(sink);
    }

    pub fn find_session_by_map_id(&self, map_id: &str) -> Option<&GameSession> {
        self.sessions
            .iter()
            .find(|session| session.map().id() == map_id)
    }

    /// Returns the session bound to the map, creating it on first use.
    pub fn get_or_create_session(&mut self, map_id: &str) -> Result<&mut GameSession, GameError> {
        if let Some(index) = self
            .sessions
            .iter()
            .position(|session| session.map().id() == map_id)
        {
            return Ok(&mut self.sessions[index]);
        }

        let map = self.find_map(map_id).ok_or(GameError::MapNotFound)?.clone();
        let generator = self
            .loot_generator_config
            .map(|config| LootGenerator::new(config.period, config.probability));
        let session_id = format!("{map_id}_session");
        self.sessions.push(GameSession::new(session_id, map, generator));
        Ok(self.sessions.last_mut().expect("session just pushed"))
    }

    pub fn find_player_by_token(&self, token: &Token) -> Option<&Player> {
        self.sessions
            .iter()
            .find_map(|session| session.find_player_by_token(token))
    }

    /// The session holding the player with this token.
    pub fn find_session_by_token(&self, token: &Token) -> Option<&GameSession> {
        self.sessions
            .iter()
            .find(|session| session.find_player_by_token(token).is_some())
    }

    /// Creates a player on the named map and returns their token and id.
    pub fn join(
        &mut self,
        map_id: &str,
        user_name: &str,
        randomize_spawn: bool,
        rng: &mut impl Rng,
    ) -> Result<JoinOutcome, GameError> {
        if user_name.is_empty() {
            return Err(GameError::InvalidInput("user name must not be empty".into()));
        }
        let map = self.find_map(map_id).ok_or(GameError::MapNotFound)?.clone();

        let mut dog = Dog::new(
            format!("{user_name}_{map_id}"),
            user_name.to_string(),
            map_id.to_string(),
        );
        let spawn = if randomize_spawn {
            map.random_position(rng)
        } else {
            map.start_position()
        };
        dog.set_position(spawn);
        dog.set_previous_position(spawn);

        // Random 128 bits are unique for any realistic process lifetime; the
        // scan guards the guarantee anyway.
        let token = loop {
            let candidate = Token::generate(rng);
            if self.find_player_by_token(&candidate).is_none() {
                break candidate;
            }
        };

        let player_id = self.next_player_id;
        self.next_player_id += 1;
        let player = Player::new(player_id, dog, token.clone(), map.bag_capacity());

        let session = self.get_or_create_session(map_id)?;
        session.add_player(player);

        Ok(JoinOutcome { token, player_id })
    }

    /// Applies a move command to the dog owned by the token's player.
    pub fn player_action(&mut self, token: &Token, command: MoveCommand) -> Result<(), GameError> {
        let map_id = self
            .find_player_by_token(token)
            .ok_or(GameError::UnknownToken)?
            .dog()
            .map_id()
            .to_string();
        let dog_speed = self
            .find_map(&map_id)
            .ok_or(GameError::MapNotFound)?
            .dog_speed();

        let player = self
            .sessions
            .iter_mut()
            .find_map(|session| session.find_player_by_token_mut(token))
            .ok_or(GameError::UnknownToken)?;

        let dog = player.dog_mut();
        match command {
            MoveCommand::Left => {
                dog.set_direction(Direction::West);
                dog.set_speed(Speed::new(-dog_speed, 0.0));
            }
            MoveCommand::Right => {
                dog.set_direction(Direction::East);
                dog.set_speed(Speed::new(dog_speed, 0.0));
            }
            MoveCommand::Up => {
                dog.set_direction(Direction::North);
                dog.set_speed(Speed::new(0.0, -dog_speed));
            }
            MoveCommand::Down => {
                dog.set_direction(Direction::South);
                dog.set_speed(Speed::new(0.0, dog_speed));
            }
            MoveCommand::Stop => dog.stop(),
        }
        Ok(())
    }

    /// Advances every session by `delta_time` seconds.
    pub fn update_state(&mut self, delta_time: f64) {
        let hooks = TickHooks {
            dog_retirement_time: self.dog_retirement_time,
            on_retired: self.retired_sink.as_ref(),
        };
        for session in &mut self.sessions {
            session.update_state(delta_time, &hooks);
        }
    }

    /// Raises the player-id counter; used when restoring a snapshot so new
    /// joins never collide with restored players.
    pub fn ensure_next_player_id(&mut self, min_next: u64) {
        if self.next_player_id < min_next {
            self.next_player_id = min_next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::map::{LootType, Road};
    use crate::domain::geom::Position;
    use crate::domain::ports::RetiredPlayer;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Mutex;

    fn town_map(id: &str) -> Map {
        let mut map = Map::new(id.into(), format!("Map {id}"));
        map.add_road(Road::horizontal(Position::new(0.0, 0.0), 10.0));
        map.set_dog_speed(4.0);
        map.set_bag_capacity(3);
        map.set_loot_types(vec![LootType {
            value: 10,
            data: serde_json::json!({"name": "key"}),
        }]);
        map
    }

    fn game_with_map() -> Game {
        let mut game = Game::new();
        game.add_map(town_map("town")).unwrap();
        game
    }

    #[test]
    fn duplicate_map_id_is_rejected() {
        let mut game = game_with_map();
        assert_eq!(
            game.add_map(town_map("town")),
            Err(GameError::DuplicateMap("town".into()))
        );
        assert_eq!(game.maps().len(), 1);
    }

    #[test]
    fn join_creates_a_session_and_a_findable_player() {
        let mut game = game_with_map();
        let mut rng = StdRng::seed_from_u64(1);
        let outcome = game.join("town", "Rex", false, &mut rng).unwrap();

        assert_eq!(outcome.player_id, 0);
        assert_eq!(game.sessions().len(), 1);

        let player = game.find_player_by_token(&outcome.token).unwrap();
        assert_eq!(player.dog().name(), "Rex");
        assert_eq!(player.dog().position(), Position::new(0.0, 0.0));

        let second = game.join("town", "Lucky", false, &mut rng).unwrap();
        assert_eq!(second.player_id, 1);
        assert_ne!(second.token, outcome.token);
        // Still one session per map.
        assert_eq!(game.sessions().len(), 1);
    }

    #[test]
    fn join_with_unknown_map_fails() {
        let mut game = game_with_map();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            game.join("nowhere", "Rex", false, &mut rng).unwrap_err(),
            GameError::MapNotFound
        );
    }

    #[test]
    fn join_with_empty_name_fails() {
        let mut game = game_with_map();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            game.join("town", "", false, &mut rng).unwrap_err(),
            GameError::InvalidInput(_)
        ));
    }

    #[test]
    fn randomized_spawn_lands_on_the_road() {
        let mut game = game_with_map();
        let mut rng = StdRng::seed_from_u64(3);
        for name in ["a", "b", "c", "d"] {
            let outcome = game.join("town", name, true, &mut rng).unwrap();
            let player = game.find_player_by_token(&outcome.token).unwrap();
            let map = game.find_map("town").unwrap();
            assert!(map.contains_position(player.dog().position()));
        }
    }

    #[test]
    fn move_commands_set_direction_and_axis_speed() {
        let mut game = game_with_map();
        let mut rng = StdRng::seed_from_u64(1);
        let outcome = game.join("town", "Rex", false, &mut rng).unwrap();

        game.player_action(&outcome.token, MoveCommand::Right).unwrap();
        let dog = game.find_player_by_token(&outcome.token).unwrap().dog();
        assert_eq!(dog.direction(), Direction::East);
        assert_eq!(dog.speed(), Speed::new(4.0, 0.0));

        game.player_action(&outcome.token, MoveCommand::Up).unwrap();
        let dog = game.find_player_by_token(&outcome.token).unwrap().dog();
        assert_eq!(dog.direction(), Direction::North);
        assert_eq!(dog.speed(), Speed::new(0.0, -4.0));

        game.player_action(&outcome.token, MoveCommand::Stop).unwrap();
        let dog = game.find_player_by_token(&outcome.token).unwrap().dog();
        assert_eq!(dog.direction(), Direction::North);
        assert_eq!(dog.speed(), Speed::ZERO);
    }

    #[test]
    fn action_with_unknown_token_fails() {
        let mut game = game_with_map();
        let token = Token::parse(&"0".repeat(32)).unwrap();
        assert_eq!(
            game.player_action(&token, MoveCommand::Left).unwrap_err(),
            GameError::UnknownToken
        );
    }

    #[test]
    fn update_state_ticks_every_session() {
        let mut game = game_with_map();
        game.add_map(town_map("harbor")).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let town = game.join("town", "Rex", false, &mut rng).unwrap();
        let harbor = game.join("harbor", "Lucky", false, &mut rng).unwrap();
        game.player_action(&town.token, MoveCommand::Right).unwrap();
        game.player_action(&harbor.token, MoveCommand::Right).unwrap();

        game.update_state(0.5);

        for token in [&town.token, &harbor.token] {
            let player = game.find_player_by_token(token).unwrap();
            assert_eq!(player.dog().position(), Position::new(2.0, 0.0));
            assert_eq!(player.play_time(), 0.5);
        }
    }

    #[test]
    fn retirement_flows_through_the_installed_sink() {
        let retired: Arc<Mutex<Vec<RetiredPlayer>>> = Arc::new(Mutex::new(Vec::new()));
        let log = retired.clone();

        let mut game = game_with_map();
        game.set_dog_retirement_time(1.0);
        game.set_retired_player_sink(Box::new(move |record| {
            log.lock().unwrap().push(record);
        }));

        let mut rng = StdRng::seed_from_u64(5);
        game.join("town", "Rex", false, &mut rng).unwrap();
        game.update_state(1.0);

        let log = retired.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].name, "Rex");
        assert!(game.sessions()[0].players().is_empty());
    }

    #[test]
    fn parse_move_codes() {
        assert_eq!(MoveCommand::parse("L"), Some(MoveCommand::Left));
        assert_eq!(MoveCommand::parse("R"), Some(MoveCommand::Right));
        assert_eq!(MoveCommand::parse("U"), Some(MoveCommand::Up));
        assert_eq!(MoveCommand::parse("D"), Some(MoveCommand::Down));
        assert_eq!(MoveCommand::parse(""), Some(MoveCommand::Stop));
        assert_eq!(MoveCommand::parse("X"), None);
        assert_eq!(MoveCommand::parse("l"), None);
    }
}
