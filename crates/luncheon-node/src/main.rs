#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use luncheon_consensus::{Miner, MinerConfig, MiningError};
use luncheon_core::ChainParams;
use luncheon_state::{ledger_path, load_ledger, save_ledger, Ledger, Validator};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Node configuration resolved from CLI, environment and defaults.
#[derive(Parser, Debug)]
#[command(name = "luncheon-node", version, about = "Minimal Luncheon node")]
struct Cli {
    /// Directory holding ledger documents
    #[arg(long, env = "LUNCHEON_DATA_DIR", default_value = "luncheon-data")]
    data_dir: PathBuf,
    /// Ledger name; stored as <data-dir>/<chain>.json
    #[arg(long, env = "LUNCHEON_CHAIN", default_value = "main")]
    chain: String,
    /// Chain parameters as JSON; missing fields take their defaults
    #[arg(long, env = "LUNCHEON_PARAMS")]
    params: Option<PathBuf>,
    /// Use scaled-down parameters for local testing
    #[arg(long, conflicts_with = "params")]
    regtest: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a ledger holding only the genesis block
    Init {
        /// Public key (hex) credited with the genesis reward
        #[arg(long)]
        genesis_miner: Option<String>,
        /// Replace an existing ledger
        #[arg(long)]
        force: bool,
    },
    /// Mine blocks on top of the stored ledger
    Mine {
        /// Public key (hex) credited with the block rewards
        #[arg(long)]
        miner: String,
        /// Number of blocks to mine
        #[arg(long, default_value_t = 1)]
        blocks: u64,
        /// Give up on a block after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Replay and check the whole stored ledger
    Verify,
    /// Show the derived balance and nonce of an account
    Account {
        /// Public key (hex)
        key: String,
    },
    /// Show chain height, tip and difficulty
    Info,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let params = resolve_params(&cli)?;

    match cli.command {
        Command::Init {
            genesis_miner,
            force,
        } => init(&cli.data_dir, &cli.chain, params, genesis_miner, force),
        Command::Mine {
            miner,
            blocks,
            timeout_secs,
        } => mine(
            &cli.data_dir,
            &cli.chain,
            params,
            &miner,
            blocks,
            timeout_secs.map(Duration::from_secs),
        ),
        Command::Verify => verify(&cli.data_dir, &cli.chain, params),
        Command::Account { key } => {
            let ledger = open(&cli.data_dir, &cli.chain, params)?;
            let account = ledger.account(&key);
            print_json(&json!({
                "key": key,
                "balance": account.balance,
                "nonce": account.nonce,
            }))
        }
        Command::Info => {
            let ledger = open(&cli.data_dir, &cli.chain, params)?;
            let next = ledger.calculate_packed_target(ledger.len() as u64);
            print_json(&json!({
                "chain": cli.chain,
                "height": ledger.height(),
                "tip": ledger.tip().map(|b| b.block_hash.to_string()),
                "difficulty": ledger.difficulty(),
                "next_packed_target": format!("0x{next:08x}"),
                "accounts": ledger.accounts().len(),
            }))
        }
    }
}

/// Parameters from `--params`, `--regtest`, or the production defaults.
fn resolve_params(cli: &Cli) -> Result<ChainParams> {
    let params = match &cli.params {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading params {}", path.display()))?;
            serde_json::from_str::<ChainParams>(&raw)
                .with_context(|| format!("parsing params {}", path.display()))?
        }
        None if cli.regtest => ChainParams::regtest(),
        None => ChainParams::default(),
    };
    params.validate().context("invalid chain parameters")?;
    Ok(params)
}

fn open(dir: &Path, chain: &str, params: ChainParams) -> Result<Ledger> {
    load_ledger(dir, chain, params)
        .with_context(|| format!("loading ledger {chain:?} from {}", dir.display()))
}

fn init(
    dir: &Path,
    chain: &str,
    mut params: ChainParams,
    genesis_miner: Option<String>,
    force: bool,
) -> Result<()> {
    let path = ledger_path(dir, chain)?;
    if path.exists() && !force {
        bail!("{} already exists; pass --force to replace it", path.display());
    }
    if let Some(miner) = genesis_miner {
        params.genesis_miner = miner;
    }

    let ledger = Ledger::init(params);
    let path = save_ledger(&ledger, dir, chain)?;
    info!(path = %path.display(), "ledger initialised");
    Ok(())
}

fn mine(
    dir: &Path,
    chain: &str,
    params: ChainParams,
    miner_key: &str,
    blocks: u64,
    timeout: Option<Duration>,
) -> Result<()> {
    let mut ledger = open(dir, chain, params.clone())?;
    let validator = Validator::new(params.clone());

    for _ in 0..blocks {
        let candidate = ledger.candidate(miner_key, Vec::new())?;
        let task = Miner::new(MinerConfig::from_params(&params)).spawn(candidate);

        let started = Instant::now();
        while !task.is_finished() {
            if timeout.is_some_and(|t| started.elapsed() >= t) {
                warn!("mining timed out; stopping");
                task.stop();
                break;
            }
            thread::sleep(Duration::from_millis(50));
        }

        let block = match task.join() {
            Ok(block) => block,
            Err(MiningError::Cancelled) => bail!("mining stopped before a block was found"),
            Err(err) => return Err(err).context("mining failed"),
        };

        let outcome = ledger
            .submit_block(&validator, block, true)
            .context("mined block rejected")?;
        save_ledger(&ledger, dir, chain)?;
        info!(
            height = ledger.height(),
            accepted = outcome.accepted.len(),
            "block stored"
        );
    }
    Ok(())
}

fn verify(dir: &Path, chain: &str, params: ChainParams) -> Result<()> {
    let ledger = open(dir, chain, params.clone())?;
    let valid = Validator::new(params).verify_blockchain(&ledger);
    print_json(&json!({ "chain": chain, "height": ledger.height(), "valid": valid }))?;
    if !valid {
        bail!("ledger {chain:?} failed verification");
    }
    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
