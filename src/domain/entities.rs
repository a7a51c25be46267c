// Mutable simulation entities: dogs, world/bag loot, players.

use crate::domain::geom::{Direction, Position, Speed};
use crate::domain::token::Token;

/// A player's avatar on the road network.
#[derive(Debug, Clone)]
pub struct Dog {
    id: String,
    name: String,
    map_id: String,
    position: Position,
    previous_position: Position,
    speed: Speed,
    direction: Direction,
}

impl Dog {
    pub fn new(id: String, name: String, map_id: String) -> Self {
        Self {
            id,
            name,
            map_id,
            position: Position::new(0.0, 0.0),
            previous_position: Position::new(0.0, 0.0),
            speed: Speed::ZERO,
            direction: Direction::North,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn map_id(&self) -> &str {
        &self.map_id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// Position at the start of the current tick, the sweep origin.
    pub fn previous_position(&self) -> Position {
        self.previous_position
    }

    pub fn snapshot_previous_position(&mut self) {
        self.previous_position = self.position;
    }

    pub fn set_previous_position(&mut self, position: Position) {
        self.previous_position = position;
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn set_speed(&mut self, speed: Speed) {
        self.speed = speed;
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    /// Zeroes velocity; facing is kept.
    pub fn stop(&mut self) {
        self.speed = Speed::ZERO;
    }

    pub fn is_moving(&self) -> bool {
        self.speed.vx != 0.0 || self.speed.vy != 0.0
    }
}

/// A loot item, either lying in the world or carried in a bag.
#[derive(Debug, Clone, PartialEq)]
pub struct Loot {
    pub id: u64,
    pub loot_type: usize,
    pub position: Position,
    pub value: i64,
}

impl Loot {
    pub fn new(id: u64, loot_type: usize, position: Position, value: i64) -> Self {
        Self {
            id,
            loot_type,
            position,
            value,
        }
    }
}

#[derive(Debug)]
pub struct Player {
    id: u64,
    token: Token,
    dog: Dog,
    bag: Vec<Loot>,
    bag_capacity: usize,
    score: i64,
    play_time: f64,
    idle_time: f64,
}

impl Player {
    pub fn new(id: u64, dog: Dog, token: Token, bag_capacity: usize) -> Self {
        Self {
            id,
            token,
            dog,
            bag: Vec::new(),
            bag_capacity,
            score: 0,
            play_time: 0.0,
            idle_time: 0.0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn dog(&self) -> &Dog {
        &self.dog
    }

    pub fn dog_mut(&mut self) -> &mut Dog {
        &mut self.dog
    }

    pub fn bag(&self) -> &[Loot] {
        &self.bag
    }

    pub fn bag_capacity(&self) -> usize {
        self.bag_capacity
    }

    pub fn is_bag_full(&self) -> bool {
        self.bag.len() >= self.bag_capacity
    }

    /// Adds to the bag unless it is already full.
    pub fn add_to_bag(&mut self, loot: Loot) {
        if self.bag.len() < self.bag_capacity {
            self.bag.push(loot);
        }
    }

    pub fn clear_bag(&mut self) {
        self.bag.clear();
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn add_score(&mut self, delta: i64) {
        self.score += delta;
    }

    pub fn play_time(&self) -> f64 {
        self.play_time
    }

    pub fn add_play_time(&mut self, delta: f64) {
        self.play_time += delta;
    }

    pub fn idle_time(&self) -> f64 {
        self.idle_time
    }

    pub fn add_idle_time(&mut self, delta: f64) {
        self.idle_time += delta;
    }

    pub fn reset_idle_time(&mut self) {
        self.idle_time = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_player(bag_capacity: usize) -> Player {
        let dog = Dog::new("rex_town".into(), "rex".into(), "town".into());
        Player::new(1, dog, Token::parse(&"a".repeat(32)).unwrap(), bag_capacity)
    }

    #[test]
    fn bag_rejects_items_beyond_capacity() {
        let mut player = test_player(2);
        for id in 0..5 {
            player.add_to_bag(Loot::new(id, 0, Position::new(0.0, 0.0), 1));
        }
        assert_eq!(player.bag().len(), 2);
        assert!(player.is_bag_full());
        assert_eq!(player.bag()[0].id, 0);
        assert_eq!(player.bag()[1].id, 1);
    }

    #[test]
    fn stop_keeps_direction() {
        let mut player = test_player(3);
        player.dog_mut().set_direction(Direction::East);
        player.dog_mut().set_speed(Speed::new(4.0, 0.0));
        player.dog_mut().stop();
        assert_eq!(player.dog().speed(), Speed::ZERO);
        assert_eq!(player.dog().direction(), Direction::East);
    }
}
