//! Background writer that keeps the durable cart in step with memory.
//!
//! Mutations hand the writer a full snapshot tagged with a revision and
//! return immediately. A single thread performs the writes, one at a time.
//! When several snapshots queue up while a write is in progress only the
//! newest is written, and a revision older than the last one written is
//! never written at all, so the stored cart cannot move backwards.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use super::events::{FailureNotice, PersistedNotice, PersistenceEvents};
use super::gateway::PersistenceGateway;
use crate::item::Cart;

/// Statistics from the persistence writer.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriterStats {
    /// Snapshots successfully written.
    pub writes: usize,
    /// Snapshots whose write failed.
    pub failures: usize,
    /// Snapshots skipped because a newer one superseded them.
    pub coalesced: usize,
    /// Message of the most recent failure, if any.
    pub last_error: Option<String>,
}

enum Command {
    Write { revision: u64, cart: Cart },
    Flush(Sender<()>),
    Stop,
}

/// A background thread that serializes cart writes.
///
/// ## Example
///
/// ```ignore
/// let writer = PersistenceWriter::spawn(gateway, PersistenceEvents::new());
///
/// writer.enqueue(1, cart.clone());
/// writer.flush();
///
/// let stats = writer.stop();
/// assert_eq!(stats.writes, 1);
/// ```
pub struct PersistenceWriter {
    // None once stop has been queued, so nothing can be sent behind it
    commands: Mutex<Option<Sender<Command>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<Mutex<WriterStats>>,
}

impl PersistenceWriter {
    /// Spawn the writer thread for `gateway`.
    pub fn spawn(gateway: PersistenceGateway, events: PersistenceEvents) -> Self {
        let (tx, rx) = channel();
        let stats = Arc::new(Mutex::new(WriterStats::default()));
        let worker_stats = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name("cart-writer".into())
            .spawn(move || run(rx, gateway, events, worker_stats));

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(error = %err, "could not start cart writer, cart will not be persisted");
                None
            }
        };

        Self {
            commands: Mutex::new(Some(tx)),
            handle: Mutex::new(handle),
            stats,
        }
    }

    /// Queue `cart` for writing.
    ///
    /// Returns false if the writer has stopped or is stopping. A snapshot
    /// accepted with `true` is always queued ahead of the stop command, so the
    /// writer attempts it before exiting; the write itself can still fail and
    /// is then reported through [`PersistenceEvents`] and [`WriterStats`].
    pub fn enqueue(&self, revision: u64, cart: Cart) -> bool {
        let sent = self.send(Command::Write { revision, cart });
        if !sent {
            warn!(revision, "cart writer stopped, snapshot not persisted");
        }
        sent
    }

    /// Block until every snapshot queued before this call has been handled.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = channel();
        if self.send(Command::Flush(ack_tx)) {
            // Err means the thread exited, which also leaves nothing pending.
            let _ = ack_rx.recv();
        }
    }

    /// Current statistics.
    pub fn stats(&self) -> WriterStats {
        lock(&self.stats).clone()
    }

    /// Write anything still queued, stop the thread, and return final stats.
    ///
    /// Snapshots enqueued after this call starts are refused.
    pub fn stop(&self) -> WriterStats {
        self.close();
        if let Some(handle) = lock(&self.handle).take() {
            if handle.join().is_err() {
                warn!("cart writer panicked");
            }
        }
        self.stats()
    }

    fn send(&self, command: Command) -> bool {
        match lock(&self.commands).as_ref() {
            Some(commands) => commands.send(command).is_ok(),
            None => false,
        }
    }

    // Queue Stop and drop the sender under one lock, so no command lands after it.
    fn close(&self) {
        if let Some(commands) = lock(&self.commands).take() {
            let _ = commands.send(Command::Stop);
        }
    }
}

impl Drop for PersistenceWriter {
    fn drop(&mut self) {
        self.close();
        // Don't join on drop - queued writes finish on the writer thread
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn run(
    rx: Receiver<Command>,
    gateway: PersistenceGateway,
    events: PersistenceEvents,
    stats: Arc<Mutex<WriterStats>>,
) {
    let mut last_written = 0u64;

    // recv fails once every sender is gone
    while let Ok(first) = rx.recv() {
        let mut pending: Option<(u64, Cart)> = None;
        let mut acks = Vec::new();
        let mut stop = false;

        for command in std::iter::once(first).chain(rx.try_iter()) {
            match command {
                Command::Write { revision, cart } => {
                    let newer = pending.as_ref().map_or(true, |(r, _)| revision > *r);
                    if pending.is_some() {
                        lock(&stats).coalesced += 1;
                    }
                    if newer {
                        pending = Some((revision, cart));
                    }
                }
                Command::Flush(ack) => acks.push(ack),
                Command::Stop => stop = true,
            }
        }

        if let Some((revision, cart)) = pending {
            if revision > last_written {
                if write(&gateway, &events, &stats, revision, &cart) {
                    last_written = revision;
                }
            } else {
                debug!(revision, last_written, "skipping stale cart snapshot");
                lock(&stats).coalesced += 1;
            }
        }

        for ack in acks {
            let _ = ack.send(());
        }

        if stop {
            break;
        }
    }

    let stats = lock(&stats);
    info!(
        writes = stats.writes,
        failures = stats.failures,
        coalesced = stats.coalesced,
        "cart writer stopped"
    );
}

fn write(
    gateway: &PersistenceGateway,
    events: &PersistenceEvents,
    stats: &Mutex<WriterStats>,
    revision: u64,
    cart: &Cart,
) -> bool {
    match gateway.save(cart) {
        Ok(()) => {
            debug!(revision, items = cart.len(), "cart persisted");
            lock(stats).writes += 1;
            events.persisted(PersistedNotice {
                revision,
                items: cart.len(),
            });
            true
        }
        Err(err) => {
            warn!(revision, error = %err, "cart write failed");
            let message = err.to_string();
            {
                let mut stats = lock(stats);
                stats.failures += 1;
                stats.last_error = Some(message.clone());
            }
            events.failed(FailureNotice {
                revision,
                key: gateway.key().to_string(),
                message,
            });
            false
        }
    }
}
