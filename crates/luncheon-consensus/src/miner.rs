//! Proof-of-work search.
//!
//! A [`Miner`] walks the 32-bit nonce space from zero, re-stamping the
//! candidate's timestamp from its [`Clock`] before every attempt, and
//! returns the first block whose header hash meets the target. The
//! timestamp is part of the hashed header, so it acts as extra entropy: the
//! same nonce can win or lose depending on when it is tried. Tests pin it
//! with a [`FixedClock`](luncheon_core::FixedClock).
//!
//! The search polls a [`StopHandle`] every `poll_interval` attempts so a
//! caller can abandon it on timeout, shutdown, or when a competing block
//! arrives.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use luncheon_core::{hash32, Block, ChainParams, Clock, SystemClock, MINER_TARGET_CEILING};
use tracing::{debug, info};

use crate::error::MiningError;
use crate::target::{hash_meets_target, unpack_target};

/// Miner tuning knobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MinerConfig {
    /// Largest compact target accepted.
    pub target_ceiling: u32,
    /// Last nonce tried before giving up.
    pub max_nonce: u32,
    /// Attempts between checks of the stop flag.
    pub poll_interval: u32,
    /// Attempts between progress log lines; zero disables them.
    pub progress_interval: u32,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            target_ceiling: MINER_TARGET_CEILING,
            max_nonce: u32::MAX,
            poll_interval: 4096,
            progress_interval: 10_000_000,
        }
    }
}

impl MinerConfig {
    /// Default knobs with the target ceiling taken from chain parameters.
    pub fn from_params(params: &ChainParams) -> Self {
        Self {
            target_ceiling: params.miner_target_ceiling,
            ..Self::default()
        }
    }
}

/// Lifecycle of a search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MinerState {
    /// No search has run, or the last one was rejected before it started.
    Idle = 0,
    /// Hashing.
    Searching = 1,
    /// The last search returned a solved block.
    Found = 2,
    /// The last search tried every nonce.
    Exhausted = 3,
    /// The last search was stopped.
    Cancelled = 4,
}

impl MinerState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Searching,
            2 => Self::Found,
            3 => Self::Exhausted,
            4 => Self::Cancelled,
            _ => Self::Idle,
        }
    }
}

/// Cloneable handle that stops a running search.
///
/// Once stopped, the miner it belongs to stays stopped.
#[derive(Clone, Debug, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// Ask the search to stop at its next poll.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Proof-of-work searcher.
pub struct Miner {
    config: MinerConfig,
    clock: Arc<dyn Clock>,
    stop: StopHandle,
    state: Arc<AtomicU8>,
}

impl Miner {
    /// Miner stamping attempts with the system clock.
    pub fn new(config: MinerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Miner stamping attempts with `clock`.
    pub fn with_clock(config: MinerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            stop: StopHandle::default(),
            state: Arc::new(AtomicU8::new(MinerState::Idle as u8)),
        }
    }

    /// Handle that cancels this miner's searches.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> MinerState {
        MinerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: MinerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Search for a nonce that solves `candidate`, blocking the caller.
    ///
    /// Returns the candidate with `timestamp`, `nonce` and `block_hash` set.
    pub fn start(&self, candidate: Block) -> Result<Block, MiningError> {
        self.check_candidate(&candidate)?;

        self.set_state(MinerState::Searching);
        let result = self.search(candidate);
        self.set_state(match &result {
            Ok(_) => MinerState::Found,
            Err(MiningError::Exhausted) => MinerState::Exhausted,
            Err(MiningError::Cancelled) => MinerState::Cancelled,
            Err(_) => MinerState::Idle,
        });
        result
    }

    /// Run [`Self::start`] on a worker thread.
    pub fn spawn(self, candidate: Block) -> MiningTask {
        let stop = self.stop_handle();
        let state = Arc::clone(&self.state);
        let handle = thread::spawn(move || self.start(candidate));
        MiningTask {
            handle,
            stop,
            state,
        }
    }

    fn check_candidate(&self, candidate: &Block) -> Result<(), MiningError> {
        if candidate.software_version.is_empty() {
            return Err(MiningError::MalformedCandidate("missing software version"));
        }
        if candidate.miner.is_empty() {
            return Err(MiningError::MalformedCandidate("missing miner key"));
        }
        let packed = candidate.packed_target;
        if packed == 0 || packed > self.config.target_ceiling {
            return Err(MiningError::InvalidTarget(packed));
        }
        Ok(())
    }

    fn search(&self, mut candidate: Block) -> Result<Block, MiningError> {
        let target = unpack_target(candidate.packed_target);
        let prefix = candidate.header_prefix();
        let mut input = Vec::with_capacity(prefix.len() + 12);
        let poll = self.config.poll_interval.max(1);

        debug!(
            packed_target = format_args!("0x{:08x}", candidate.packed_target),
            prev = %candidate.prev_hash,
            txs = candidate.transactions.len(),
            "mining started"
        );

        let mut nonce: u32 = 0;
        loop {
            if nonce % poll == 0 && self.stop.is_stopped() {
                debug!(nonce, "mining cancelled");
                return Err(MiningError::Cancelled);
            }

            let timestamp = self.clock.now_unix();
            input.clear();
            input.extend_from_slice(&prefix);
            input.extend_from_slice(&timestamp.to_be_bytes());
            input.extend_from_slice(&nonce.to_be_bytes());
            let hash = hash32(&input);

            if hash_meets_target(&hash, &target) {
                candidate.timestamp = timestamp;
                candidate.nonce = nonce;
                candidate.block_hash = hash;
                info!(nonce, timestamp, hash = %hash, "block solved");
                return Ok(candidate);
            }

            if self.config.progress_interval != 0
                && nonce != 0
                && nonce % self.config.progress_interval == 0
            {
                debug!(nonce, last_hash = %hash, "mining");
            }

            if nonce >= self.config.max_nonce {
                return Err(MiningError::Exhausted);
            }
            nonce += 1;
        }
    }
}

/// A search running on its own thread.
pub struct MiningTask {
    handle: JoinHandle<Result<Block, MiningError>>,
    stop: StopHandle,
    state: Arc<AtomicU8>,
}

impl MiningTask {
    /// Request cancellation; the worker exits at its next poll.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Handle that cancels this task.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Current lifecycle state of the worker's miner.
    pub fn state(&self) -> MinerState {
        MinerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether the worker has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker and return its result.
    pub fn join(self) -> Result<Block, MiningError> {
        self.handle
            .join()
            .unwrap_or(Err(MiningError::WorkerPanicked))
    }
}
