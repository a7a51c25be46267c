// A session binds one map to its live players and loot and owns the tick.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::collision::{
    find_gather_events, Gatherer, GathererSource, Item, ItemSource,
};
use crate::domain::entities::{Loot, Player};
use crate::domain::geom::Position;
use crate::domain::loot_generator::LootGenerator;
use crate::domain::map::{Map, Office, DOG_RADIUS, OFFICE_RADIUS};
use crate::domain::ports::{RetiredPlayer, RetiredPlayerSink};
use crate::domain::token::Token;

/// Speeds below this on both axes count as standing still.
const IDLE_EPSILON: f64 = 1e-10;

/// Per-tick context handed down by the game: the retirement threshold and the
/// sink notified for every retired player.
pub struct TickHooks<'a> {
    pub dog_retirement_time: f64,
    pub on_retired: Option<&'a RetiredPlayerSink>,
}

pub struct GameSession {
    id: String,
    map: Arc<Map>,
    players: Vec<Player>,
    loots: Vec<Loot>,
    next_loot_id: u64,
    loot_generator: Option<LootGenerator>,
    rng: StdRng,
}

impl GameSession {
    pub fn new(id: String, map: Arc<Map>, loot_generator: Option<LootGenerator>) -> Self {
        Self {
            id,
            map,
            players: Vec::new(),
            loots: Vec::new(),
            next_loot_id: 0,
            loot_generator,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn map(&self) -> &Arc<Map> {
        &self.map
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn players_mut(&mut self) -> &mut [Player] {
        &mut self.players
    }

    pub fn loots(&self) -> &[Loot] {
        &self.loots
    }

    pub fn add_player(&mut self, player: Player) {
        self.players.push(player);
    }

    pub fn add_loot(&mut self, loot: Loot) {
        self.loots.push(loot);
    }

    pub fn next_loot_id(&self) -> u64 {
        self.next_loot_id
    }

    pub fn set_next_loot_id(&mut self, id: u64) {
        self.next_loot_id = id;
    }

    pub fn find_player_by_token(&self, token: &Token) -> Option<&Player> {
        self.players.iter().find(|player| player.token() == token)
    }

    pub fn find_player_by_token_mut(&mut self, token: &Token) -> Option<&mut Player> {
        self.players
            .iter_mut()
            .find(|player| player.token() == token)
    }

    /// Advances the session by `delta_time` seconds.
    ///
    /// Phases run strictly in order: timekeeping, loot spawn, movement,
    /// collision resolution, retirement.
    pub fn update_state(&mut self, delta_time: f64, hooks: &TickHooks<'_>) {
        self.advance_timers(delta_time);
        self.spawn_loot(delta_time);
        self.move_dogs(delta_time);
        self.handle_collisions();
        self.retire_inactive_players(hooks);
    }

    // The idle decision looks at the speed before the move phase, so an
    // action that set a velocity between ticks stops idle accrual now.
    fn advance_timers(&mut self, delta_time: f64) {
        for player in &mut self.players {
            player.add_play_time(delta_time);
            let speed = player.dog().speed();
            let is_idle = speed.vx.abs() < IDLE_EPSILON && speed.vy.abs() < IDLE_EPSILON;
            if is_idle {
                player.add_idle_time(delta_time);
            } else {
                player.reset_idle_time();
            }
        }
    }

    fn spawn_loot(&mut self, delta_time: f64) {
        let Some(generator) = self.loot_generator.as_mut() else {
            return;
        };
        let loot_types_count = self.map.loot_types().len();
        if loot_types_count == 0 {
            return;
        }

        let spawn_count = generator.generate(
            Duration::from_secs_f64(delta_time),
            self.loots.len(),
            self.players.len(),
        );

        for _ in 0..spawn_count {
            let loot_type = self.rng.gen_range(0..loot_types_count);
            let position = self.map.random_position(&mut self.rng);
            let value = self.map.loot_types()[loot_type].value;
            let id = self.next_loot_id;
            self.next_loot_id += 1;
            self.loots.push(Loot::new(id, loot_type, position, value));
        }
    }

    fn move_dogs(&mut self, delta_time: f64) {
        for player in &mut self.players {
            let dog = player.dog_mut();
            dog.snapshot_previous_position();
            if !dog.is_moving() {
                continue;
            }
            let result = self.map.move_dog(dog.position(), dog.speed(), delta_time);
            dog.set_position(result.position);
            if result.hit_boundary {
                dog.stop();
            }
        }
    }

    fn handle_collisions(&mut self) {
        let sweeps = DogSweeps(&self.players);
        let pickup_events = find_gather_events(&LootItems(&self.loots), &sweeps);
        let delivery_events = find_gather_events(&OfficeItems(self.map.offices()), &sweeps);

        // Merge both streams and replay them in chronological order so a
        // delivery that happens before a pickup empties the bag first.
        let mut events: Vec<TickEvent> = pickup_events
            .into_iter()
            .map(|event| TickEvent {
                time: event.time,
                player_index: event.gatherer_index,
                kind: TickEventKind::Pickup {
                    loot_index: event.item_index,
                },
            })
            .chain(delivery_events.into_iter().map(|event| TickEvent {
                time: event.time,
                player_index: event.gatherer_index,
                kind: TickEventKind::Delivery,
            }))
            .collect();
        events.sort_by(|a, b| {
            a.time
                .partial_cmp(&b.time)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut collected: HashSet<u64> = HashSet::new();
        for event in events {
            // Out-of-range indices only happen on corrupted state; skip.
            let Some(player) = self.players.get_mut(event.player_index) else {
                continue;
            };
            match event.kind {
                TickEventKind::Pickup { loot_index } => {
                    let Some(loot) = self.loots.get(loot_index) else {
                        continue;
                    };
                    if collected.contains(&loot.id) || player.is_bag_full() {
                        continue;
                    }
                    let loot = loot.clone();
                    collected.insert(loot.id);
                    player.add_to_bag(loot);
                }
                TickEventKind::Delivery => {
                    let banked: i64 = player.bag().iter().map(|loot| loot.value).sum();
                    player.add_score(banked);
                    player.clear_bag();
                }
            }
        }

        self.loots.retain(|loot| !collected.contains(&loot.id));
    }

    fn retire_inactive_players(&mut self, hooks: &TickHooks<'_>) {
        let threshold = hooks.dog_retirement_time;
        let mut survivors = Vec::with_capacity(self.players.len());
        for player in self.players.drain(..) {
            if player.idle_time() >= threshold {
                if let Some(sink) = hooks.on_retired {
                    sink(RetiredPlayer {
                        name: player.dog().name().to_string(),
                        score: player.score(),
                        play_time: player.play_time(),
                    });
                }
            } else {
                survivors.push(player);
            }
        }
        self.players = survivors;
    }
}

struct TickEvent {
    time: f64,
    player_index: usize,
    kind: TickEventKind,
}

enum TickEventKind {
    Pickup { loot_index: usize },
    Delivery,
}

struct LootItems<'a>(&'a [Loot]);

impl ItemSource for LootItems<'_> {
    fn item_count(&self) -> usize {
        self.0.len()
    }

    fn get_item(&self, index: usize) -> Item {
        Item {
            position: self.0[index].position,
            width: 0.0,
        }
    }
}

struct OfficeItems<'a>(&'a [Office]);

impl ItemSource for OfficeItems<'_> {
    fn item_count(&self) -> usize {
        self.0.len()
    }

    fn get_item(&self, index: usize) -> Item {
        Item {
            position: self.0[index].position,
            width: OFFICE_RADIUS,
        }
    }
}

struct DogSweeps<'a>(&'a [Player]);

impl GathererSource for DogSweeps<'_> {
    fn gatherer_count(&self) -> usize {
        self.0.len()
    }

    fn get_gatherer(&self, index: usize) -> Gatherer {
        let dog = self.0[index].dog();
        Gatherer {
            start: dog.previous_position(),
            end: dog.position(),
            width: DOG_RADIUS,
        }
    }
}
