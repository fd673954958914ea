use log::{debug, info};
use thiserror::Error;

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use super::block::Block;

/// Errors that can occur while driving a mining engine
#[derive(Debug, Error)]
pub enum MinerError {
    #[error("No mined block available: miner is {0}")]
    NotReady(&'static str),

    #[error("Invalid miner state: expected {expected}, found {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Mining worker thread panicked")]
    Worker,
}

/// Lifecycle of one engine; the candidate block travels with the phase
enum MinerPhase {
    Idle(Block),
    Running,
    Completed(Block),
    Interrupted,
}

impl MinerPhase {
    fn name(&self) -> &'static str {
        match self {
            MinerPhase::Idle(_) => "idle",
            MinerPhase::Running => "running",
            MinerPhase::Completed(_) => "completed",
            MinerPhase::Interrupted => "interrupted",
        }
    }
}

/// State shared between the engine handle and its worker thread
struct MinerShared {
    phase: Mutex<MinerPhase>,
    cancel: AtomicBool,
}

/// Proof-of-work engine for one candidate block
///
/// Runs the nonce search on a dedicated background thread, started once via
/// `start`. The search is cancellable through `interrupt`: the worker polls a
/// shared flag on every iteration and parks the engine in a terminal state
/// from which no block can be read. The engine moves through
/// idle → running → completed or interrupted, and never restarts.
pub struct Miner {
    shared: Arc<MinerShared>,
    worker: Option<thread::JoinHandle<()>>,
}

impl Miner {
    /// Creates an idle engine owning the candidate block
    pub fn new(block: Block) -> Self {
        Miner {
            shared: Arc::new(MinerShared {
                phase: Mutex::new(MinerPhase::Idle(block)),
                cancel: AtomicBool::new(false),
            }),
            worker: None,
        }
    }

    /// Starts the background nonce search
    ///
    /// # Returns
    ///
    /// Ok(()) once the worker thread is running; an InvalidState error if the
    /// engine has already been started
    pub fn start(&mut self) -> Result<(), MinerError> {
        let block = {
            let mut phase = self.shared.phase.lock().unwrap();
            match mem::replace(&mut *phase, MinerPhase::Running) {
                MinerPhase::Idle(block) => block,
                other => {
                    let actual = other.name();
                    *phase = other;
                    return Err(MinerError::InvalidState {
                        expected: "idle",
                        actual,
                    });
                }
            }
        };

        info!(
            "Mining block on top of {} against target {}",
            block.prev_hash, block.difficulty
        );

        let shared = Arc::clone(&self.shared);
        self.worker = Some(thread::spawn(move || mine(&shared, block)));
        Ok(())
    }

    /// Returns the mined block once the search has completed
    ///
    /// Never blocks. Any state other than completed, including an
    /// interrupted search, answers with a NotReady error.
    pub fn get_mined_block(&self) -> Result<Block, MinerError> {
        let phase = self.shared.phase.lock().unwrap();
        match &*phase {
            MinerPhase::Completed(block) => Ok(block.clone()),
            other => Err(MinerError::NotReady(other.name())),
        }
    }

    /// Checks whether the worker is still searching
    pub fn is_alive(&self) -> bool {
        matches!(&*self.shared.phase.lock().unwrap(), MinerPhase::Running)
    }

    /// Requests cooperative cancellation of a running search
    ///
    /// Returns without waiting for the worker to stop; the worker observes
    /// the flag on its next iteration. An InvalidState error is returned
    /// unless the engine is currently running, and a failed interrupt leaves
    /// the engine untouched.
    pub fn interrupt(&self) -> Result<(), MinerError> {
        let phase = self.shared.phase.lock().unwrap();
        match &*phase {
            MinerPhase::Running => {
                self.shared.cancel.store(true, Ordering::SeqCst);
                debug!("Cancellation requested");
                Ok(())
            }
            other => Err(MinerError::InvalidState {
                expected: "running",
                actual: other.name(),
            }),
        }
    }

    /// Blocks until the worker thread reaches a terminal state
    ///
    /// Joining a never-started engine is an InvalidState error; joining an
    /// engine that already finished (or was already joined) returns
    /// immediately.
    pub fn join(&mut self) -> Result<(), MinerError> {
        match self.worker.take() {
            Some(handle) => handle.join().map_err(|_| MinerError::Worker),
            None => {
                let phase = self.shared.phase.lock().unwrap();
                if let MinerPhase::Idle(_) = &*phase {
                    Err(MinerError::InvalidState {
                        expected: "running",
                        actual: "idle",
                    })
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// The worker loop: scan nonces until the target is met or cancellation wins
fn mine(shared: &MinerShared, mut block: Block) {
    loop {
        if shared.cancel.load(Ordering::SeqCst) {
            let nonce = block.nonce;
            *shared.phase.lock().unwrap() = MinerPhase::Interrupted;
            info!("Mining interrupted at nonce {:016x}", nonce);
            return;
        }

        if block.meets_difficulty() {
            let hash = block.hash();
            let nonce = block.nonce;
            *shared.phase.lock().unwrap() = MinerPhase::Completed(block);
            info!("Mined block {} at nonce {:016x}", hash, nonce);
            return;
        }

        block.set_nonce(block.nonce.wrapping_add(1));
    }
}
