pub mod game;
pub mod session;
pub mod ticker;

pub use game::{Game, JoinOutcome, LootGeneratorConfig, MoveCommand};
pub use session::{GameSession, TickHooks};
pub use ticker::{tick_loop, TickListener};
