//! Asynchronous integrity sealing.
//!
//! A single consumer drains a FIFO queue of newly admitted record ids and
//! writes a keyed integrity hash back into each record. Sealing is
//! best-effort and may lag admission; a record is fully usable before its
//! seal lands, observable via `MemoryRecord::sealed`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::events::{EventEmitter, MemoryEvent};
use crate::registry::store::SharedRecords;
use crate::registry::types::RecordId;

/// Commands accepted by the sealing worker.
#[derive(Debug)]
pub enum SealCommand {
    /// Seal the record with the given id
    Seal(RecordId),
    /// Sentinel: finish queued work and stop
    Shutdown,
}

/// Handle to the background sealing task.
pub struct SealingWorker {
    sender: mpsc::UnboundedSender<SealCommand>,
    handle: Option<JoinHandle<()>>,
}

impl SealingWorker {
    /// Spawn the worker over a shared record arena.
    ///
    /// `latency` simulates per-item cryptographic work; `sealed` is
    /// incremented once per completed seal write-back.
    pub fn spawn(
        records: SharedRecords,
        sealed: Arc<AtomicU64>,
        seed: impl Into<String>,
        latency: Duration,
        emitter: Arc<dyn EventEmitter>,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let seed = seed.into();
        let handle = tokio::spawn(run(receiver, records, sealed, seed, latency, emitter));
        Self {
            sender,
            handle: Some(handle),
        }
    }

    /// Enqueue a record for sealing. Never blocks.
    ///
    /// Returns `false` if the worker has already stopped.
    pub fn submit(&self, id: RecordId) -> bool {
        self.sender.send(SealCommand::Seal(id)).is_ok()
    }

    /// Push the shutdown sentinel and join the worker.
    ///
    /// Items enqueued before the sentinel are sealed before the worker
    /// exits.
    pub async fn shutdown(&mut self) -> Result<()> {
        let _ = self.sender.send(SealCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .map_err(|e| Error::internal(format!("sealing worker panicked: {}", e)))?;
        }
        Ok(())
    }
}

async fn run(
    mut receiver: mpsc::UnboundedReceiver<SealCommand>,
    records: SharedRecords,
    sealed: Arc<AtomicU64>,
    seed: String,
    latency: Duration,
    emitter: Arc<dyn EventEmitter>,
) {
    while let Some(command) = receiver.recv().await {
        match command {
            SealCommand::Shutdown => break,
            SealCommand::Seal(id) => {
                // Placeholder for real cryptographic work
                tokio::time::sleep(latency).await;

                let payload = {
                    let records = records.read().unwrap();
                    match records.get(&id) {
                        Some(record) if !record.sealed() => match record.canonical_json() {
                            Ok(json) => Some(json),
                            Err(e) => {
                                warn!(id = %id.short(), error = %e, "seal serialization failed");
                                None
                            }
                        },
                        // Evicted before sealing, or already sealed
                        _ => None,
                    }
                };

                if let Some(payload) = payload {
                    let seal = compute_seal(&payload, &seed);
                    let mut written = false;
                    {
                        let mut records = records.write().unwrap();
                        if let Some(record) = records.get_mut(&id) {
                            if record.seal.is_none() {
                                record.seal = Some(seal);
                                written = true;
                            }
                        }
                    }
                    if written {
                        sealed.fetch_add(1, Ordering::Relaxed);
                        emitter.emit(MemoryEvent::sealed(&id));
                        debug!(id = %id.short(), "record sealed");
                    }
                }
            }
        }
    }
    debug!("sealing worker stopped");
}

/// Keyed integrity hash over a record's canonical serialization.
pub fn compute_seal(canonical: &str, seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hasher.update(seed.as_bytes());
    format!("{:x}", hasher.finalize())
}
