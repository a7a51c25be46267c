// The driven tick loop and its observer hook.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::time::{Instant, MissedTickBehavior};

use crate::use_cases::game::Game;

/// Observer notified after every state update, in registration order. The
/// snapshot autosaver hangs off this.
pub trait TickListener: Send + Sync {
    fn on_tick(&self, delta: Duration, game: &Game);
}

/// Drives `game.update_state` every `period` until `shutdown` fires.
///
/// The delta passed to the game is the measured wall-clock gap between
/// iterations, so a late tick advances the simulation by the real elapsed
/// time instead of drifting.
pub async fn tick_loop(
    game: Arc<Mutex<Game>>,
    listeners: Arc<Vec<Arc<dyn TickListener>>>,
    period: Duration,
    shutdown: Arc<Notify>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Consume the immediate first fire so the first delta spans one period.
    interval.tick().await;
    let mut last_tick = Instant::now();

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            _ = interval.tick() => {}
        }

        let now = Instant::now();
        let delta = now - last_tick;
        last_tick = now;

        let mut game = game.lock().await;
        game.update_state(delta.as_secs_f64());
        for listener in listeners.iter() {
            listener.on_tick(delta, &game);
        }
    }
}
