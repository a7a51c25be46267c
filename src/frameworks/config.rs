// Game configuration loading and runtime settings.
//
// The game config is a JSON document with the map catalog and global
// defaults; runtime settings come from the environment (no CLI parser).

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fmt};

use serde::Deserialize;

use crate::domain::geom::{Offset, Position, Rectangle, Size};
use crate::domain::map::{Building, LootType, Map, Office, Road};
use crate::interface_adapters::protocol::{BuildingDto, OfficeDto, RoadDto};
use crate::use_cases::game::{Game, LootGeneratorConfig};

const DEFAULT_DOG_SPEED: f64 = 1.0;
const DEFAULT_BAG_CAPACITY: usize = 3;
const DEFAULT_DOG_RETIREMENT_TIME: f64 = 60.0;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "cannot read config: {err}"),
            ConfigError::Parse(err) => write!(f, "cannot parse config: {err}"),
            ConfigError::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameConfig {
    #[serde(default)]
    default_dog_speed: Option<f64>,
    #[serde(default)]
    default_bag_capacity: Option<usize>,
    #[serde(default)]
    loot_generator_config: Option<LootGeneratorSettings>,
    #[serde(default)]
    dog_retirement_time: Option<f64>,
    maps: Vec<MapConfig>,
}

#[derive(Debug, Deserialize)]
struct LootGeneratorSettings {
    /// Base interval in seconds.
    period: f64,
    probability: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapConfig {
    id: String,
    name: String,
    #[serde(default)]
    dog_speed: Option<f64>,
    #[serde(default)]
    bag_capacity: Option<usize>,
    #[serde(default)]
    roads: Vec<RoadDto>,
    #[serde(default)]
    buildings: Vec<BuildingDto>,
    #[serde(default)]
    offices: Vec<OfficeDto>,
    #[serde(default)]
    loot_types: Vec<serde_json::Value>,
}

/// Loads the game config file and builds a populated [`Game`].
///
/// Any failure here is fatal: the server refuses to start without maps.
pub fn load_game(path: &Path) -> Result<Game, ConfigError> {
    let body = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: GameConfig = serde_json::from_str(&body).map_err(ConfigError::Parse)?;
    build_game(config)
}

fn build_game(config: GameConfig) -> Result<Game, ConfigError> {
    let mut game = Game::new();

    if let Some(settings) = config.loot_generator_config {
        if !(0.0..=1.0).contains(&settings.probability) {
            return Err(ConfigError::Invalid(
                "lootGeneratorConfig.probability must be in [0, 1]".into(),
            ));
        }
        game.set_loot_generator_config(LootGeneratorConfig {
            period: Duration::from_secs_f64(settings.period),
            probability: settings.probability,
        });
    }
    game.set_dog_retirement_time(
        config
            .dog_retirement_time
            .unwrap_or(DEFAULT_DOG_RETIREMENT_TIME),
    );

    let default_dog_speed = config.default_dog_speed.unwrap_or(DEFAULT_DOG_SPEED);
    let default_bag_capacity = config.default_bag_capacity.unwrap_or(DEFAULT_BAG_CAPACITY);

    for map_config in config.maps {
        let map = build_map(map_config, default_dog_speed, default_bag_capacity)?;
        game.add_map(map)
            .map_err(|err| ConfigError::Invalid(format!("{err:?}")))?;
    }
    Ok(game)
}

fn build_map(
    config: MapConfig,
    default_dog_speed: f64,
    default_bag_capacity: usize,
) -> Result<Map, ConfigError> {
    let mut map = Map::new(config.id, config.name);
    map.set_dog_speed(config.dog_speed.unwrap_or(default_dog_speed));
    map.set_bag_capacity(config.bag_capacity.unwrap_or(default_bag_capacity));

    for road in config.roads {
        map.add_road(match road {
            RoadDto::Horizontal { x0, y0, x1 } => {
                Road::horizontal(Position::new(x0 as f64, y0 as f64), x1 as f64)
            }
            RoadDto::Vertical { x0, y0, y1 } => {
                Road::vertical(Position::new(x0 as f64, y0 as f64), y1 as f64)
            }
        });
    }

    for building in config.buildings {
        map.add_building(Building {
            bounds: Rectangle {
                position: Position::new(building.x as f64, building.y as f64),
                size: Size {
                    width: building.w as f64,
                    height: building.h as f64,
                },
            },
        });
    }

    for office in config.offices {
        map.add_office(Office {
            id: office.id,
            position: Position::new(office.x as f64, office.y as f64),
            offset: Offset {
                dx: office.offset_x as f64,
                dy: office.offset_y as f64,
            },
        })
        .map_err(|err| ConfigError::Invalid(format!("{err:?}")))?;
    }

    let loot_types = config
        .loot_types
        .into_iter()
        .map(|data| {
            let value = data
                .get("value")
                .and_then(|value| value.as_i64())
                .unwrap_or(0);
            LootType { value, data }
        })
        .collect();
    map.set_loot_types(loot_types);

    Ok(map)
}

/// Runtime settings, read from the environment.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub config_path: PathBuf,
    pub port: u16,
    /// None or zero period means no periodic loop; the tick endpoint drives time.
    pub tick_period: Option<Duration>,
    pub state_file: Option<PathBuf>,
    pub save_period: Duration,
    pub randomize_spawn_points: bool,
    pub database_url: Option<String>,
}

impl ServerOptions {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config_path = env::var("GAME_CONFIG_PATH")
            .map_err(|_| ConfigError::Invalid("GAME_CONFIG_PATH is not set".into()))?;

        Ok(Self {
            config_path: PathBuf::from(config_path),
            port: env_parsed("GAME_SERVER_PORT").unwrap_or(8080),
            tick_period: env_parsed::<u64>("GAME_TICK_PERIOD_MS")
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            state_file: env::var("GAME_STATE_FILE").ok().map(PathBuf::from),
            save_period: env_parsed::<u64>("GAME_SAVE_PERIOD_MS")
                .map(Duration::from_millis)
                .unwrap_or(Duration::ZERO),
            randomize_spawn_points: matches!(
                env::var("GAME_RANDOMIZE_SPAWN_POINTS").as_deref(),
                Ok("1") | Ok("true")
            ),
            database_url: env::var("GAME_DB_URL").ok(),
        })
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}
