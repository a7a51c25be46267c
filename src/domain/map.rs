// Immutable per-map world: road graph, buildings, offices, loot catalog,
// spawn sampling and the road-constrained move primitive.

use rand::Rng;

use crate::domain::errors::GameError;
use crate::domain::geom::{MoveResult, Offset, Position, Rectangle, Speed};

/// Half-width of the walkable strip around a road segment.
pub const ROAD_HALF_WIDTH: f64 = 0.4;
/// Collision radius of an office treated as a point.
pub const OFFICE_RADIUS: f64 = 0.5;
/// Collision radius of a dog during the tick sweep.
pub const DOG_RADIUS: f64 = 0.6;

/// An axis-aligned road segment with integer endpoints.
///
/// The walkable strip is the segment inflated by [`ROAD_HALF_WIDTH`] on all
/// sides, so it extends 0.4 past both endpoints and 0.4 to each side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Road {
    start: Position,
    end: Position,
}

impl Road {
    pub fn horizontal(start: Position, end_x: f64) -> Self {
        Self {
            start,
            end: Position::new(end_x, start.y),
        }
    }

    pub fn vertical(start: Position, end_y: f64) -> Self {
        Self {
            start,
            end: Position::new(start.x, end_y),
        }
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn end(&self) -> Position {
        self.end
    }

    pub fn is_horizontal(&self) -> bool {
        self.start.y == self.end.y
    }

    pub fn is_vertical(&self) -> bool {
        self.start.x == self.end.x
    }

    pub fn min_x(&self) -> f64 {
        self.start.x.min(self.end.x)
    }

    pub fn max_x(&self) -> f64 {
        self.start.x.max(self.end.x)
    }

    pub fn min_y(&self) -> f64 {
        self.start.y.min(self.end.y)
    }

    pub fn max_y(&self) -> f64 {
        self.start.y.max(self.end.y)
    }

    /// Membership in the walkable strip, boundary inclusive.
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.min_x() - ROAD_HALF_WIDTH
            && pos.x <= self.max_x() + ROAD_HALF_WIDTH
            && pos.y >= self.min_y() - ROAD_HALF_WIDTH
            && pos.y <= self.max_y() + ROAD_HALF_WIDTH
    }

    /// Clamps a point into the walkable strip rectangle.
    fn clamp_into_strip(&self, pos: Position) -> Position {
        Position::new(
            pos.x
                .clamp(self.min_x() - ROAD_HALF_WIDTH, self.max_x() + ROAD_HALF_WIDTH),
            pos.y
                .clamp(self.min_y() - ROAD_HALF_WIDTH, self.max_y() + ROAD_HALF_WIDTH),
        )
    }
}

/// Informational rectangle; buildings do not constrain movement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Building {
    pub bounds: Rectangle,
}

/// A delivery point. Crossing its disk banks the whole bag.
#[derive(Debug, Clone, PartialEq)]
pub struct Office {
    pub id: String,
    pub position: Position,
    pub offset: Offset,
}

/// One entry of a map's loot catalog: the score value plus the opaque
/// client-facing JSON the maps API echoes back.
#[derive(Debug, Clone)]
pub struct LootType {
    pub value: i64,
    pub data: serde_json::Value,
}

#[derive(Debug)]
pub struct Map {
    id: String,
    name: String,
    roads: Vec<Road>,
    buildings: Vec<Building>,
    offices: Vec<Office>,
    loot_types: Vec<LootType>,
    dog_speed: f64,
    bag_capacity: usize,
}

impl Map {
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            roads: Vec::new(),
            buildings: Vec::new(),
            offices: Vec::new(),
            loot_types: Vec::new(),
            dog_speed: 0.0,
            bag_capacity: 3,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn offices(&self) -> &[Office] {
        &self.offices
    }

    pub fn loot_types(&self) -> &[LootType] {
        &self.loot_types
    }

    pub fn dog_speed(&self) -> f64 {
        self.dog_speed
    }

    pub fn set_dog_speed(&mut self, speed: f64) {
        self.dog_speed = speed;
    }

    pub fn bag_capacity(&self) -> usize {
        self.bag_capacity
    }

    pub fn set_bag_capacity(&mut self, capacity: usize) {
        self.bag_capacity = capacity;
    }

    pub fn add_road(&mut self, road: Road) {
        self.roads.push(road);
    }

    pub fn add_building(&mut self, building: Building) {
        self.buildings.push(building);
    }

    /// Registers an office; ids must be unique within the map.
    pub fn add_office(&mut self, office: Office) -> Result<(), GameError> {
        if self.offices.iter().any(|o| o.id == office.id) {
            return Err(GameError::DuplicateOffice(office.id));
        }
        self.offices.push(office);
        Ok(())
    }

    pub fn set_loot_types(&mut self, loot_types: Vec<LootType>) {
        self.loot_types = loot_types;
    }

    /// Bounding box of the union of road strips.
    pub fn movement_bounds(&self) -> (Position, Position) {
        if self.roads.is_empty() {
            return (Position::new(0.0, 0.0), Position::new(0.0, 0.0));
        }

        let mut min = Position::new(f64::MAX, f64::MAX);
        let mut max = Position::new(f64::MIN, f64::MIN);
        for road in &self.roads {
            min.x = min.x.min(road.min_x() - ROAD_HALF_WIDTH);
            min.y = min.y.min(road.min_y() - ROAD_HALF_WIDTH);
            max.x = max.x.max(road.max_x() + ROAD_HALF_WIDTH);
            max.y = max.y.max(road.max_y() + ROAD_HALF_WIDTH);
        }
        (min, max)
    }

    pub fn contains_position(&self, pos: Position) -> bool {
        self.roads.iter().any(|road| road.contains(pos))
    }

    /// First endpoint of the first road; the non-randomized spawn point.
    pub fn start_position(&self) -> Position {
        self.roads
            .first()
            .map(|road| road.start())
            .unwrap_or(Position::new(0.0, 0.0))
    }

    /// Uniform position on a uniformly chosen road: sampled along the long
    /// axis within `[min + 0.4, max - 0.4]` (whole segment when degenerate),
    /// perpendicular coordinate pinned to the road line.
    pub fn random_position(&self, rng: &mut impl Rng) -> Position {
        if self.roads.is_empty() {
            return Position::new(0.0, 0.0);
        }

        let road = self.roads[rng.gen_range(0..self.roads.len())];
        if road.is_horizontal() {
            let mut min_x = road.min_x() + ROAD_HALF_WIDTH;
            let mut max_x = road.max_x() - ROAD_HALF_WIDTH;
            if min_x >= max_x {
                min_x = road.min_x();
                max_x = road.max_x();
            }
            if min_x == max_x {
                return Position::new(min_x, road.start().y);
            }
            Position::new(rng.gen_range(min_x..max_x), road.start().y)
        } else {
            let mut min_y = road.min_y() + ROAD_HALF_WIDTH;
            let mut max_y = road.max_y() - ROAD_HALF_WIDTH;
            if min_y >= max_y {
                min_y = road.min_y();
                max_y = road.max_y();
            }
            if min_y == max_y {
                return Position::new(road.start().x, min_y);
            }
            Position::new(road.start().x, rng.gen_range(min_y..max_y))
        }
    }

    /// Advances a dog along the road network for `delta_time` seconds.
    ///
    /// The target is clamped to the map's movement bounds, accepted if it
    /// lands on any road strip, and otherwise slid onto the closest strip
    /// among the roads the dog currently stands on. The result always lies in
    /// the union of road strips; `hit_boundary` tells the caller to zero the
    /// dog's speed.
    pub fn move_dog(&self, start: Position, speed: Speed, delta_time: f64) -> MoveResult {
        if self.roads.is_empty() {
            return MoveResult {
                position: start,
                hit_boundary: false,
            };
        }

        let target = Position::new(
            start.x + speed.vx * delta_time,
            start.y + speed.vy * delta_time,
        );

        let (min_bound, max_bound) = self.movement_bounds();
        let mut clamped = target;
        let mut hit_boundary = false;
        if target.x < min_bound.x {
            clamped.x = min_bound.x;
            hit_boundary = true;
        } else if target.x > max_bound.x {
            clamped.x = max_bound.x;
            hit_boundary = true;
        }
        if target.y < min_bound.y {
            clamped.y = min_bound.y;
            hit_boundary = true;
        } else if target.y > max_bound.y {
            clamped.y = max_bound.y;
            hit_boundary = true;
        }

        if self.contains_position(clamped) {
            return MoveResult {
                position: clamped,
                hit_boundary,
            };
        }

        // The clamped target left every strip: slide along the roads the dog
        // is standing on (two of them at a junction) and keep the projection
        // closest to where it wanted to go.
        let mut best = start;
        let mut best_sq_distance = f64::MAX;
        for road in self.roads.iter().filter(|road| road.contains(start)) {
            let projected = road.clamp_into_strip(clamped);
            if !road.contains(projected) {
                continue;
            }
            let dx = clamped.x - projected.x;
            let dy = clamped.y - projected.y;
            let sq_distance = dx * dx + dy * dy;
            if sq_distance < best_sq_distance {
                best_sq_distance = sq_distance;
                best = projected;
            }
        }

        let slid = best.x != clamped.x || best.y != clamped.y;
        MoveResult {
            position: best,
            hit_boundary: hit_boundary || slid,
        }
    }
}
