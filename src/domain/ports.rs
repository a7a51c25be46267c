use async_trait::async_trait;

/// Final record of a player removed for inactivity.
#[derive(Debug, Clone, PartialEq)]
pub struct RetiredPlayer {
    pub name: String,
    pub score: i64,
    /// Total time in game, seconds.
    pub play_time: f64,
}

/// Callback invoked once per retirement, installed by the host before ticking.
pub type RetiredPlayerSink = Box<dyn Fn(RetiredPlayer) + Send + Sync>;

/// A leaderboard row as read back from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRecord {
    pub name: String,
    pub score: i64,
    /// Play time in seconds.
    pub play_time: f64,
}

// Port for the high-score storage behind the records endpoint.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn add_record(&self, name: &str, score: i64, play_time_ms: i64) -> Result<(), String>;
    async fn get_records(&self, start: u64, max_items: u64) -> Result<Vec<PlayerRecord>, String>;
}
