//! Background autosave worker: round trips run here, off the editing thread.
//!
//! Communication is via `mpsc` channels. The worker executes tickets in the
//! order received and never applies results itself; the session feeds every
//! [`RoundTripDone`] back through `AutosaveState::complete`.

use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::autosave::{run_round_trip, AutosaveTicket, RoundTripOutcome};
use crate::backend::StrategyBackend;

/// Commands sent from the session to the worker.
#[derive(Debug)]
pub enum WorkerCommand {
    RoundTrip(AutosaveTicket),
    Shutdown,
}

/// A finished round trip, sent back to the session.
#[derive(Debug, Clone)]
pub struct RoundTripDone {
    pub ticket: AutosaveTicket,
    pub outcome: RoundTripOutcome,
}

#[derive(Debug, thiserror::Error)]
#[error("autosave worker has stopped")]
pub struct WorkerStopped;

pub struct AutosaveWorker {
    commands: Sender<WorkerCommand>,
    results: Receiver<RoundTripDone>,
    handle: Option<JoinHandle<()>>,
}

impl AutosaveWorker {
    /// Spawn the worker thread.
    pub fn spawn(backend: Arc<dyn StrategyBackend>) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (res_tx, res_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("stratgraph-autosave".into())
            .spawn(move || worker_loop(backend, cmd_rx, res_tx))?;
        Ok(Self {
            commands: cmd_tx,
            results: res_rx,
            handle: Some(handle),
        })
    }

    pub fn submit(&self, ticket: AutosaveTicket) -> Result<(), WorkerStopped> {
        self.commands
            .send(WorkerCommand::RoundTrip(ticket))
            .map_err(|_| WorkerStopped)
    }

    /// A finished round trip, if one is ready.
    pub fn try_recv(&self) -> Result<Option<RoundTripDone>, WorkerStopped> {
        match self.results.try_recv() {
            Ok(done) => Ok(Some(done)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(WorkerStopped),
        }
    }

    /// Block up to `timeout` for a finished round trip.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<RoundTripDone>, WorkerStopped> {
        match self.results.recv_timeout(timeout) {
            Ok(done) => Ok(Some(done)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(WorkerStopped),
        }
    }

    /// Stop the worker after its current round trip and wait for it.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.commands.send(WorkerCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("autosave worker panicked");
            }
        }
    }
}

impl Drop for AutosaveWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for AutosaveWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutosaveWorker")
            .field("running", &self.handle.is_some())
            .finish()
    }
}

fn worker_loop(
    backend: Arc<dyn StrategyBackend>,
    commands: Receiver<WorkerCommand>,
    results: Sender<RoundTripDone>,
) {
    loop {
        match commands.recv() {
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
            Ok(WorkerCommand::RoundTrip(ticket)) => {
                debug!(id = ticket.id, "round trip started");
                let outcome = run_round_trip(backend.as_ref(), &ticket);
                if results.send(RoundTripDone { ticket, outcome }).is_err() {
                    break;
                }
            }
        }
    }
    debug!("autosave worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autosave::AutosaveState;
    use crate::backend::InMemoryBackend;
    use stratgraph_core::templates::StrategyTemplate;

    #[test]
    fn executes_round_trips_in_order() {
        let backend = Arc::new(InMemoryBackend::new());
        let worker = AutosaveWorker::spawn(backend.clone()).unwrap();
        let mut state = AutosaveState::new();

        let ticket = state.begin(&StrategyTemplate::GoldenCross.build()).unwrap();
        worker.submit(ticket.clone()).unwrap();
        let done = worker
            .recv_timeout(Duration::from_secs(5))
            .unwrap()
            .expect("round trip finished");
        assert_eq!(done.ticket.id, ticket.id);
        assert_eq!(done.outcome, RoundTripOutcome::Saved { version: 1 });
        assert_eq!(backend.version_count(), 1);

        worker.shutdown();
    }

    #[test]
    fn try_recv_is_empty_when_idle() {
        let worker = AutosaveWorker::spawn(Arc::new(InMemoryBackend::new())).unwrap();
        assert!(worker.try_recv().unwrap().is_none());
    }
}
