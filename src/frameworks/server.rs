// Server wiring: configuration, storage, snapshot persistence, the tick
// loop and the HTTP listener.

use std::error::Error;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex, Notify};

use crate::domain::ports::{RecordStore, RetiredPlayer};
use crate::frameworks::config::{self, ServerOptions};
use crate::frameworks::db::{InMemoryRecordStore, PgRecordStore};
use crate::interface_adapters::routes;
use crate::interface_adapters::snapshot::{self, SnapshotListener};
use crate::interface_adapters::state::AppState;
use crate::use_cases::ticker::{tick_loop, TickListener};

/// Boots the game server on an already-bound listener and serves until
/// shutdown. Returning an error here aborts startup.
pub async fn run(listener: TcpListener, options: ServerOptions) -> Result<(), Box<dyn Error>> {
    // Map configuration is the one thing the server cannot start without.
    let mut game = config::load_game(&options.config_path)?;

    let records: Arc<dyn RecordStore> = match options.database_url.as_deref() {
        Some(url) => {
            let store = PgRecordStore::connect(url).await?;
            tracing::info!("connected to the records database");
            Arc::new(store)
        }
        None => {
            tracing::warn!("GAME_DB_URL is not set, keeping records in memory");
            Arc::new(InMemoryRecordStore::new())
        }
    };

    // Retirements leave the serialized tick context through a channel; a
    // background task owns the slow database write.
    let (retired_tx, mut retired_rx) = mpsc::unbounded_channel::<RetiredPlayer>();
    game.set_retired_player_sink(Box::new(move |record| {
        let _ = retired_tx.send(record);
    }));
    let record_writer = records.clone();
    let retired_task = tokio::spawn(async move {
        while let Some(record) = retired_rx.recv().await {
            let play_time_ms = (record.play_time * 1000.0) as i64;
            tracing::info!(
                name = %record.name,
                score = record.score,
                play_time = record.play_time,
                "player retired"
            );
            if let Err(err) = record_writer
                .add_record(&record.name, record.score, play_time_ms)
                .await
            {
                tracing::error!(error = %err, "failed to store retired player record");
            }
        }
    });

    if let Some(path) = options.state_file.as_deref() {
        if let Err(err) = snapshot::load_game(&mut game, path) {
            tracing::warn!(error = %err, "could not load saved state, starting fresh");
        }
    }
    let snapshot_listener = options
        .state_file
        .clone()
        .map(|path| Arc::new(SnapshotListener::new(path, options.save_period)));

    let mut tick_listeners: Vec<Arc<dyn TickListener>> = Vec::new();
    if let Some(listener) = snapshot_listener.as_ref() {
        tick_listeners.push(listener.clone());
    }

    let state = AppState {
        game: Arc::new(Mutex::new(game)),
        records,
        tick_listeners: Arc::new(tick_listeners),
        manual_tick: options.tick_period.is_none(),
        randomize_spawn_points: options.randomize_spawn_points,
    };

    let ticker_shutdown = Arc::new(Notify::new());
    let ticker_task = options.tick_period.map(|period| {
        tracing::info!(period_ms = period.as_millis() as u64, "starting tick loop");
        tokio::spawn(tick_loop(
            state.game.clone(),
            state.tick_listeners.clone(),
            period,
            ticker_shutdown.clone(),
        ))
    });

    let app = routes::app(state.clone());
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Orderly shutdown: stop ticking, then persist the final state.
    tracing::info!("shutting down");
    // notify_one stores a permit, so the loop sees it even if it is mid-tick.
    ticker_shutdown.notify_one();
    if let Some(task) = ticker_task {
        let _ = task.await;
    }
    retired_task.abort();
    if let Some(listener) = snapshot_listener {
        let game = state.game.lock().await;
        listener.save_now(&game);
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
