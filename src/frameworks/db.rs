// Leaderboard storage: PostgreSQL in production, in-memory when no database
// is configured (and in tests).

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tokio::sync::Mutex;

use crate::domain::ports::{PlayerRecord, RecordStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS retired_players (
    id           BIGSERIAL PRIMARY KEY,
    name         TEXT NOT NULL,
    score        BIGINT NOT NULL,
    play_time_ms BIGINT NOT NULL,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS retired_players_score_idx
    ON retired_players (score DESC, play_time_ms ASC, name ASC);
"#;

pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Builds a small pool and makes sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn add_record(&self, name: &str, score: i64, play_time_ms: i64) -> Result<(), String> {
        sqlx::query("INSERT INTO retired_players (name, score, play_time_ms) VALUES ($1, $2, $3)")
            .bind(name)
            .bind(score)
            .bind(play_time_ms)
            .execute(&self.pool)
            .await
            .map_err(|err| err.to_string())?;
        Ok(())
    }

    async fn get_records(&self, start: u64, max_items: u64) -> Result<Vec<PlayerRecord>, String> {
        let rows = sqlx::query(
            "SELECT name, score, play_time_ms FROM retired_players \
             ORDER BY score DESC, play_time_ms ASC, name ASC \
             OFFSET $1 LIMIT $2",
        )
        .bind(start as i64)
        .bind(max_items as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| err.to_string())?;

        Ok(rows
            .into_iter()
            .map(|row| PlayerRecord {
                name: row.get("name"),
                score: row.get("score"),
                play_time: row.get::<i64, _>("play_time_ms") as f64 / 1000.0,
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct StoredRecord {
    name: String,
    score: i64,
    play_time_ms: i64,
}

/// Keeps records in memory with the same ordering contract as Postgres.
#[derive(Default)]
pub struct InMemoryRecordStore {
    rows: Arc<Mutex<Vec<StoredRecord>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn add_record(&self, name: &str, score: i64, play_time_ms: i64) -> Result<(), String> {
        let mut rows = self.rows.lock().await;
        rows.push(StoredRecord {
            name: name.to_string(),
            score,
            play_time_ms,
        });
        Ok(())
    }

    async fn get_records(&self, start: u64, max_items: u64) -> Result<Vec<PlayerRecord>, String> {
        let mut rows = self.rows.lock().await.clone();
        rows.sort_by(|a, b| match b.score.cmp(&a.score) {
            Ordering::Equal => match a.play_time_ms.cmp(&b.play_time_ms) {
                Ordering::Equal => a.name.cmp(&b.name),
                other => other,
            },
            other => other,
        });
        Ok(rows
            .into_iter()
            .skip(start as usize)
            .take(max_items as usize)
            .map(|row| PlayerRecord {
                name: row.name,
                score: row.score,
                play_time: row.play_time_ms as f64 / 1000.0,
            })
            .collect())
    }
}
