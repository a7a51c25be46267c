// Swept-disk collision detection over a single tick.
//
// Gatherers move linearly from `start` to `end` during the tick; items stand
// still. An event is reported when the gatherer's disk overlaps the item's
// disk at the point of closest approach, with `time` being the sweep
// parameter in [0, 1].

use std::cmp::Ordering;

use crate::domain::geom::Position;

/// A static collectible: a point with a collision radius.
#[derive(Debug, Clone, Copy)]
pub struct Item {
    pub position: Position,
    pub width: f64,
}

/// A moving collector: the segment swept during the tick plus a radius.
#[derive(Debug, Clone, Copy)]
pub struct Gatherer {
    pub start: Position,
    pub end: Position,
    pub width: f64,
}

/// One gatherer/item overlap during the sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatherEvent {
    pub item_index: usize,
    pub gatherer_index: usize,
    pub sq_distance: f64,
    pub time: f64,
}

pub trait ItemSource {
    fn item_count(&self) -> usize;
    fn get_item(&self, index: usize) -> Item;
}

pub trait GathererSource {
    fn gatherer_count(&self) -> usize;
    fn get_gatherer(&self, index: usize) -> Gatherer;
}

impl ItemSource for [Item] {
    fn item_count(&self) -> usize {
        self.len()
    }

    fn get_item(&self, index: usize) -> Item {
        self[index]
    }
}

impl GathererSource for [Gatherer] {
    fn gatherer_count(&self) -> usize {
        self.len()
    }

    fn get_gatherer(&self, index: usize) -> Gatherer {
        self[index]
    }
}

#[derive(Debug, Clone, Copy)]
struct CollectionResult {
    sq_distance: f64,
    proj_ratio: f64,
}

// Projects item `c` onto the sweep segment `a -> b`. The displacement must be
// non-zero; callers filter stationary gatherers first.
fn try_collect_point(a: Position, b: Position, c: Position) -> CollectionResult {
    debug_assert!(b.x != a.x || b.y != a.y);
    let u_x = c.x - a.x;
    let u_y = c.y - a.y;
    let v_x = b.x - a.x;
    let v_y = b.y - a.y;
    let u_dot_v = u_x * v_x + u_y * v_y;
    let u_len2 = u_x * u_x + u_y * u_y;
    let v_len2 = v_x * v_x + v_y * v_y;

    CollectionResult {
        sq_distance: u_len2 - (u_dot_v * u_dot_v) / v_len2,
        proj_ratio: u_dot_v / v_len2,
    }
}

/// Finds every gather event over one tick, ordered chronologically.
///
/// Overlap is inclusive: `sq_distance == (r_gatherer + r_item)^2` still
/// counts. Equal-time events break ties on (gatherer, item) index so the
/// order is deterministic.
pub fn find_gather_events(
    items: &(impl ItemSource + ?Sized),
    gatherers: &(impl GathererSource + ?Sized),
) -> Vec<GatherEvent> {
    let mut events = Vec::new();

    for gatherer_index in 0..gatherers.gatherer_count() {
        let gatherer = gatherers.get_gatherer(gatherer_index);
        if gatherer.start == gatherer.end {
            continue;
        }

        for item_index in 0..items.item_count() {
            let item = items.get_item(item_index);
            let result = try_collect_point(gatherer.start, gatherer.end, item.position);
            let collect_radius = gatherer.width + item.width;

            if result.proj_ratio >= 0.0
                && result.proj_ratio <= 1.0
                && result.sq_distance <= collect_radius * collect_radius
            {
                events.push(GatherEvent {
                    item_index,
                    gatherer_index,
                    sq_distance: result.sq_distance,
                    time: result.proj_ratio,
                });
            }
        }
    }

    events.sort_by(|a, b| {
        a.time
            .partial_cmp(&b.time)
            .unwrap_or(Ordering::Equal)
            .then(a.gatherer_index.cmp(&b.gatherer_index))
            .then(a.item_index.cmp(&b.item_index))
    });

    events
}
