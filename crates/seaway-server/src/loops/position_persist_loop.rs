//! Position persistence loop.
//!
//! Batches position updates into periodic transactions. Every update is
//! appended to the history table; nothing is coalesced away.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;

use crate::backoff::Backoff;
use crate::persistence::{vessels as vessels_db, Database};
use crate::state::{AppState, PositionUpdate};

const POSITION_FLUSH_SECS: u64 = 1;
const POSITION_DB_BACKOFF_MAX_SECS: u64 = 30;

pub async fn run_position_persist_loop(
    db: Database,
    app_state: Arc<AppState>,
    mut rx: mpsc::Receiver<PositionUpdate>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(Duration::from_secs(POSITION_FLUSH_SECS));
    let mut backoff = Backoff::new(
        Duration::from_secs(POSITION_FLUSH_SECS),
        Duration::from_secs(POSITION_DB_BACKOFF_MAX_SECS),
    );
    let mut pending: Vec<PositionUpdate> = Vec::new();

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Position persistence loop shutting down");
                break;
            }
            maybe_update = rx.recv() => {
                match maybe_update {
                    Some(update) => {
                        pending.push(update);
                        while let Ok(update) = rx.try_recv() {
                            pending.push(update);
                        }
                        pending.extend(app_state.take_persist_overflow());
                    }
                    None => {
                        tracing::info!("Position persistence channel closed");
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                pending.extend(app_state.take_persist_overflow());
                if !backoff.ready() {
                    continue;
                }
                match flush_pending(&db, &mut pending).await {
                    Ok(0) => {}
                    Ok(written) => {
                        tracing::debug!(written, "Flushed vessel positions");
                        backoff.reset();
                    }
                    Err(err) => {
                        let delay = backoff.fail();
                        tracing::warn!(
                            "Position persistence flush failed: {} (backing off {:?})",
                            err,
                            delay
                        );
                    }
                }
            }
        }
    }

    pending.extend(app_state.take_persist_overflow());
    if let Err(err) = flush_pending(&db, &mut pending).await {
        tracing::warn!("Position persistence final flush failed: {}", err);
    }
}

/// Write every pending update in one transaction. On failure the batch is
/// put back so the next tick retries it.
async fn flush_pending(db: &Database, pending: &mut Vec<PositionUpdate>) -> Result<usize> {
    if pending.is_empty() {
        return Ok(0);
    }

    let batch = std::mem::take(pending);
    let result = async {
        let mut tx = db.pool().begin().await?;
        for update in &batch {
            vessels_db::record_position_tx(&mut tx, update).await?;
        }
        tx.commit().await?;
        Ok::<_, anyhow::Error>(())
    }
    .await;

    match result {
        Ok(()) => Ok(batch.len()),
        Err(err) => {
            let mut restored = batch;
            restored.append(pending);
            *pending = restored;
            Err(err)
        }
    }
}
