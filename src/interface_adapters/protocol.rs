// Wire DTOs for the game API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::geom::{round6, Direction};
use crate::domain::map::{Building, Map, Office, Road};

// Standard error envelope for every API failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub user_name: String,
    pub map_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub auth_token: String,
    pub player_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct PlayerActionRequest {
    #[serde(rename = "move")]
    pub move_command: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickRequest {
    pub time_delta: i64,
}

// Player name row of GET /api/v1/game/players.
#[derive(Debug, Serialize, Deserialize)]
pub struct PlayerName {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BagItem {
    pub id: u64,
    #[serde(rename = "type")]
    pub loot_type: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlayerState {
    pub pos: [f64; 2],
    pub speed: [f64; 2],
    pub dir: String,
    pub bag: Vec<BagItem>,
    pub score: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LostObject {
    #[serde(rename = "type")]
    pub loot_type: usize,
    pub pos: [f64; 2],
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateResponse {
    pub players: BTreeMap<String, PlayerState>,
    pub lost_objects: BTreeMap<String, LostObject>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRow {
    pub name: String,
    pub score: i64,
    pub play_time: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MapListItem {
    pub id: String,
    pub name: String,
}

// Road wire shape: {x0, y0, x1} for horizontal, {x0, y0, y1} for vertical.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoadDto {
    Horizontal { x0: i64, y0: i64, x1: i64 },
    Vertical { x0: i64, y0: i64, y1: i64 },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BuildingDto {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficeDto {
    pub id: String,
    pub x: i64,
    pub y: i64,
    pub offset_x: i64,
    pub offset_y: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapResponse {
    pub id: String,
    pub name: String,
    pub roads: Vec<RoadDto>,
    pub buildings: Vec<BuildingDto>,
    pub offices: Vec<OfficeDto>,
    pub loot_types: Vec<serde_json::Value>,
}

impl From<&Road> for RoadDto {
    fn from(road: &Road) -> Self {
        if road.is_horizontal() {
            RoadDto::Horizontal {
                x0: road.start().x as i64,
                y0: road.start().y as i64,
                x1: road.end().x as i64,
            }
        } else {
            RoadDto::Vertical {
                x0: road.start().x as i64,
                y0: road.start().y as i64,
                y1: road.end().y as i64,
            }
        }
    }
}

impl From<&Building> for BuildingDto {
    fn from(building: &Building) -> Self {
        Self {
            x: building.bounds.position.x as i64,
            y: building.bounds.position.y as i64,
            w: building.bounds.size.width as i64,
            h: building.bounds.size.height as i64,
        }
    }
}

impl From<&Office> for OfficeDto {
    fn from(office: &Office) -> Self {
        Self {
            id: office.id.clone(),
            x: office.position.x as i64,
            y: office.position.y as i64,
            offset_x: office.offset.dx as i64,
            offset_y: office.offset.dy as i64,
        }
    }
}

impl From<&Map> for MapResponse {
    fn from(map: &Map) -> Self {
        Self {
            id: map.id().to_string(),
            name: map.name().to_string(),
            roads: map.roads().iter().map(RoadDto::from).collect(),
            buildings: map.buildings().iter().map(BuildingDto::from).collect(),
            offices: map.offices().iter().map(OfficeDto::from).collect(),
            loot_types: map
                .loot_types()
                .iter()
                .map(|loot_type| loot_type.data.clone())
                .collect(),
        }
    }
}

/// Client code for a facing: L/R/U/D.
pub fn direction_code(direction: Direction) -> &'static str {
    match direction {
        Direction::West => "L",
        Direction::East => "R",
        Direction::North => "U",
        Direction::South => "D",
    }
}

pub fn rounded_pair(x: f64, y: f64) -> [f64; 2] {
    [round6(x), round6(y)]
}
