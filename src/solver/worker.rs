//! Background bias solving.
//!
//! A single worker thread takes jobs from a channel and solves them one at
//! a time. Submitting a job cancels the one before it, so at most one solve
//! is live and stale results never reach the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::circuit::Schematic;
use crate::error::{Result, SimError};

use super::bias::{bias, BiasSolution};
use super::{SimulationKind, SimulatorConfig};

/// Shared cancellation flag, polled by the solver between mode rounds and
/// frequencies.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(SimError::Cancelled)` once cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(SimError::Cancelled)
        } else {
            Ok(())
        }
    }
}

struct Job {
    generation: u64,
    schematic: Schematic,
    kind: SimulationKind,
    cancel: CancelToken,
}

/// Result of one submitted job.
#[derive(Debug)]
pub struct BiasOutcome {
    /// Generation returned by [`BiasWorker::submit`]
    pub generation: u64,
    pub result: Result<BiasSolution>,
}

/// Handle to the background solver thread.
pub struct BiasWorker {
    jobs: Option<Sender<Job>>,
    outcomes: Receiver<BiasOutcome>,
    generation: u64,
    current: Option<CancelToken>,
    handle: Option<JoinHandle<()>>,
}

impl BiasWorker {
    /// Start the worker thread.
    pub fn spawn(config: SimulatorConfig) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (outcome_tx, outcome_rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            while let Ok(mut job) = job_rx.recv() {
                // Skip straight to the newest queued job
                while let Ok(newer) = job_rx.try_recv() {
                    job = newer;
                }

                let result = bias(&job.schematic, job.kind, &config, &job.cancel);
                if let Err(SimError::Cancelled) = result {
                    log::warn!("bias job {} cancelled", job.generation);
                }
                let outcome = BiasOutcome {
                    generation: job.generation,
                    result,
                };
                if outcome_tx.send(outcome).is_err() {
                    break;
                }
            }
        });

        Self {
            jobs: Some(job_tx),
            outcomes: outcome_rx,
            generation: 0,
            current: None,
            handle: Some(handle),
        }
    }

    /// Queue a solve, cancelling the one in flight. Returns the generation
    /// its outcome will carry.
    pub fn submit(&mut self, schematic: Schematic, kind: SimulationKind) -> Result<u64> {
        self.cancel();
        self.generation += 1;
        let cancel = CancelToken::new();
        let job = Job {
            generation: self.generation,
            schematic,
            kind,
            cancel: cancel.clone(),
        };
        self.jobs
            .as_ref()
            .ok_or(SimError::WorkerDisconnected)?
            .send(job)
            .map_err(|_| SimError::WorkerDisconnected)?;
        self.current = Some(cancel);
        Ok(self.generation)
    }

    /// Cancel the latest submission, if any.
    pub fn cancel(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }

    /// Generation of the latest submission, 0 before the first.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Non-blocking poll for the latest submission's outcome. Stale
    /// outcomes are discarded.
    pub fn try_recv(&mut self) -> Result<Option<BiasOutcome>> {
        loop {
            match self.outcomes.try_recv() {
                Ok(outcome) if outcome.generation == self.generation => {
                    self.current = None;
                    return Ok(Some(outcome));
                }
                Ok(stale) => log::debug!("dropping stale bias outcome {}", stale.generation),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => return Err(SimError::WorkerDisconnected),
            }
        }
    }

    /// Block until the latest submission's outcome arrives.
    pub fn recv(&mut self) -> Result<BiasOutcome> {
        loop {
            let outcome = self
                .outcomes
                .recv()
                .map_err(|_| SimError::WorkerDisconnected)?;
            if outcome.generation == self.generation {
                self.current = None;
                return Ok(outcome);
            }
            log::debug!("dropping stale bias outcome {}", outcome.generation);
        }
    }
}

impl Drop for BiasWorker {
    fn drop(&mut self) {
        self.cancel();
        // Closing the job channel ends the worker loop
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
